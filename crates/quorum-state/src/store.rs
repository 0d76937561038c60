//! StateStore — redb-backed persistence for the scheduler state.
//!
//! The whole scheduler state is saved as one JSON document on every
//! persist; there is no incremental update. Each successful persist bumps
//! a revision counter kept alongside the document.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::SchedulerState;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Saves a full snapshot of some state.
pub trait Persister<S: ?Sized>: Send + Sync {
    fn persist(&self, state: &S) -> StateResult<()>;
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(SCHEDULER).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Write the full state document and bump the revision, atomically.
    pub fn save<S: Serialize + ?Sized>(&self, state: &S) -> StateResult<u64> {
        let value = serde_json::to_vec(state).map_err(map_err!(Encode))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let revision;
        {
            let mut table = txn.open_table(SCHEDULER).map_err(map_err!(Table))?;
            table
                .insert(STATE_KEY, value.as_slice())
                .map_err(map_err!(Write))?;

            let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
            let current = meta
                .get(REVISION_KEY)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value())
                .unwrap_or(0);
            revision = current + 1;
            meta.insert(REVISION_KEY, revision).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(revision, bytes = value.len(), "scheduler state persisted");
        Ok(revision)
    }

    /// Load the last persisted scheduler state, if any.
    pub fn load_scheduler_state<C: DeserializeOwned>(
        &self,
    ) -> StateResult<Option<SchedulerState<C>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SCHEDULER).map_err(map_err!(Table))?;
        match table.get(STATE_KEY).map_err(map_err!(Read))? {
            Some(guard) => {
                let state = serde_json::from_slice(guard.value()).map_err(map_err!(Decode))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Number of successful persists over the store's lifetime.
    pub fn revision(&self) -> StateResult<u64> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(META).map_err(map_err!(Table))?;
        Ok(table
            .get(REVISION_KEY)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }
}

impl<S: Serialize + ?Sized> Persister<S> for StateStore {
    fn persist(&self, state: &S) -> StateResult<()> {
        self.save(state).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> SchedulerState<Vec<String>> {
        let mut state = SchedulerState::new("quorum");
        state.add_cluster("default", vec!["node-1".to_string()]);
        state.add_cluster("old", vec![]);
        state.retire_cluster("old");
        state
    }

    #[test]
    fn empty_store_has_no_state() {
        let store = StateStore::open_in_memory().unwrap();
        let loaded: Option<SchedulerState<Vec<String>>> = store.load_scheduler_state().unwrap();
        assert!(loaded.is_none());
        assert_eq!(store.revision().unwrap(), 0);
    }

    #[test]
    fn persist_then_load() {
        let store = StateStore::open_in_memory().unwrap();
        let state = test_state();

        store.persist(&state).unwrap();
        let loaded: Option<SchedulerState<Vec<String>>> = store.load_scheduler_state().unwrap();

        assert_eq!(loaded, Some(state));
    }

    #[test]
    fn each_persist_bumps_revision() {
        let store = StateStore::open_in_memory().unwrap();
        let mut state = test_state();

        assert_eq!(store.save(&state).unwrap(), 1);
        state.add_cluster("second", vec![]);
        assert_eq!(store.save(&state).unwrap(), 2);
        assert_eq!(store.revision().unwrap(), 2);

        let loaded: SchedulerState<Vec<String>> = store.load_scheduler_state().unwrap().unwrap();
        assert!(loaded.cluster("second").is_some());
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quorum.redb");

        {
            let store = StateStore::open(&path).unwrap();
            store.persist(&test_state()).unwrap();
        }

        let store = StateStore::open(&path).unwrap();
        let loaded: SchedulerState<Vec<String>> = store.load_scheduler_state().unwrap().unwrap();
        assert!(loaded.is_retired("old"));
        assert_eq!(store.revision().unwrap(), 1);
    }

    #[test]
    fn unreadable_document_is_a_decode_error() {
        let store = StateStore::open_in_memory().unwrap();
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(SCHEDULER).unwrap();
            table.insert(STATE_KEY, b"not json".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let err = store
            .load_scheduler_state::<Vec<String>>()
            .unwrap_err();
        assert!(matches!(err, StateError::Decode(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn clones_share_the_database() {
        let store = StateStore::open_in_memory().unwrap();
        let clone = store.clone();
        clone.persist(&test_state()).unwrap();
        assert_eq!(store.revision().unwrap(), 1);
    }
}

//! Shared scheduler state and its persistence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use quorum_state::{Persister, SchedulerState, TaskStatus};

use crate::cluster::ManagedCluster;
use crate::error::SchedulerResult;

/// The scheduler state behind its lock, plus the persister that saves it.
///
/// State must only be mutated while the lock is held.
pub struct SchedulerCore<C> {
    state: Mutex<SchedulerState<C>>,
    persister: Arc<dyn Persister<SchedulerState<C>>>,
    /// Set when a save fails; cleared by the next successful save.
    persist_pending: AtomicBool,
}

impl<C: ManagedCluster> SchedulerCore<C> {
    pub fn new(
        state: SchedulerState<C>,
        persister: Arc<dyn Persister<SchedulerState<C>>>,
    ) -> Self {
        Self {
            state: Mutex::new(state),
            persister,
            persist_pending: AtomicBool::new(false),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, SchedulerState<C>> {
        self.state.lock().await
    }

    /// Save a full snapshot. Callers pass the state they hold locked.
    ///
    /// A failed save leaves the core marked as pending until a later save
    /// succeeds.
    pub fn persist(&self, state: &SchedulerState<C>) -> SchedulerResult<()> {
        if let Err(e) = self.persister.persist(state) {
            self.persist_pending.store(true, Ordering::SeqCst);
            warn!(error = %e, retryable = e.is_retryable(), "scheduler state persist failed");
            return Err(e.into());
        }
        self.persist_pending.store(false, Ordering::SeqCst);
        debug!(
            clusters = state.clusters.len(),
            graveyard = state.graveyard.len(),
            "scheduler state persisted"
        );
        Ok(())
    }

    /// True while in-memory changes have not reached the persister.
    pub fn persist_pending(&self) -> bool {
        self.persist_pending.load(Ordering::SeqCst)
    }

    /// Persist if `dirty` or if an earlier save failed. Returns whether a
    /// save was made.
    pub fn persist_if_needed(
        &self,
        state: &SchedulerState<C>,
        dirty: bool,
    ) -> SchedulerResult<bool> {
        if !dirty && !self.persist_pending() {
            return Ok(false);
        }
        self.persist(state)?;
        Ok(true)
    }

    /// Route a status update to the live cluster owning the task and
    /// persist if one did. Returns whether the update was applied.
    pub async fn status_update(&self, status: &TaskStatus) -> SchedulerResult<bool> {
        let mut state = self.lock().await;
        let applied = state
            .clusters
            .values_mut()
            .any(|cluster| cluster.handle_status_update(&status.task_id, status.state));
        if !applied {
            warn!(task_id = %status.task_id, state = ?status.state, "status update for unknown task");
            return Ok(false);
        }
        self.persist(&state)?;
        Ok(true)
    }
}

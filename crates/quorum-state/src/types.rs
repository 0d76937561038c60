//! Domain types for the Quorum scheduler state.
//!
//! Identifiers used when talking to the resource manager, the task
//! states it reports, and the process-wide [`SchedulerState`] that owns
//! every live and retired cluster.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a launched task.
    TaskId
);
string_id!(
    /// Identifier of the executor hosting a task.
    ExecutorId
);
string_id!(
    /// Identifier of the agent (slave) a task runs on.
    SlaveId
);

// ── Task status ────────────────────────────────────────────────────

/// Task state as reported by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Staging,
    Starting,
    Running,
    Killing,
    Finished,
    Failed,
    Killed,
    Lost,
    Error,
}

impl TaskState {
    /// True once the task can no longer make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Failed | Self::Killed | Self::Lost | Self::Error
        )
    }
}

/// A task status entry, as sent in a reconciliation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: TaskId,
    pub slave_id: Option<SlaveId>,
    pub state: TaskState,
}

// ── Scheduler state ────────────────────────────────────────────────

/// Process-wide scheduler state: live clusters and the graveyard.
///
/// A cluster leaves `clusters` for `graveyard` exactly once, through
/// [`SchedulerState::retire_cluster`]; nothing moves it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState<C> {
    pub framework_name: String,
    pub clusters: BTreeMap<String, C>,
    pub graveyard: BTreeMap<String, C>,
}

impl<C> SchedulerState<C> {
    pub fn new(framework_name: impl Into<String>) -> Self {
        Self {
            framework_name: framework_name.into(),
            clusters: BTreeMap::new(),
            graveyard: BTreeMap::new(),
        }
    }

    /// Insert a live cluster, returning any cluster it replaced.
    pub fn add_cluster(&mut self, name: impl Into<String>, cluster: C) -> Option<C> {
        self.clusters.insert(name.into(), cluster)
    }

    pub fn cluster(&self, name: &str) -> Option<&C> {
        self.clusters.get(name)
    }

    pub fn cluster_mut(&mut self, name: &str) -> Option<&mut C> {
        self.clusters.get_mut(name)
    }

    /// Move a live cluster into the graveyard. Returns false if no live
    /// cluster has that name.
    pub fn retire_cluster(&mut self, name: &str) -> bool {
        match self.clusters.remove(name) {
            Some(cluster) => {
                self.graveyard.insert(name.to_string(), cluster);
                true
            }
            None => false,
        }
    }

    pub fn is_retired(&self, name: &str) -> bool {
        self.graveyard.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TaskState::Finished.is_terminal());
        assert!(TaskState::Lost.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(!TaskState::Killing.is_terminal());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&TaskId::new("riak-a-1")).unwrap();
        assert_eq!(json, "\"riak-a-1\"");
    }

    #[test]
    fn retire_moves_cluster_once() {
        let mut state: SchedulerState<u32> = SchedulerState::new("quorum");
        state.add_cluster("a", 1);

        assert!(state.retire_cluster("a"));
        assert!(state.cluster("a").is_none());
        assert!(state.is_retired("a"));
        assert_eq!(state.graveyard.get("a"), Some(&1));

        assert!(!state.retire_cluster("a"));
        assert_eq!(state.graveyard.len(), 1);
    }
}

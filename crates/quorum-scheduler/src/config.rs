//! Scheduler configuration, loaded from TOML.
//!
//! ```toml
//! framework_name = "quorum"
//!
//! [reconcile]
//! interval_secs = 5
//! finish_message = "finish"
//!
//! [state]
//! path = "/var/lib/quorum/state.redb"
//!
//! [node]
//! cpus = 1.0
//! mem = 2048.0
//! disk = 20000.0
//! ports = 3
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use quorum_resources::NodeRequest;
use quorum_state::{StateResult, StateStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub framework_name: String,
    pub reconcile: ReconcileConfig,
    pub state: StateConfig,
    pub node: NodeDefaults,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            framework_name: "quorum".to_string(),
            reconcile: ReconcileConfig::default(),
            state: StateConfig::default(),
            node: NodeDefaults::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval_secs: u64,
    /// Payload of the graceful-shutdown message sent before a kill.
    pub finish_message: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            finish_message: "finish".to_string(),
        }
    }
}

impl ReconcileConfig {
    /// Tick period, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// redb file; in-memory when unset.
    pub path: Option<PathBuf>,
}

impl StateConfig {
    pub fn open_store(&self) -> StateResult<StateStore> {
        match &self.path {
            Some(path) => StateStore::open(path),
            None => StateStore::open_in_memory(),
        }
    }
}

/// Resources requested for each node of a new cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDefaults {
    pub cpus: f64,
    pub mem: f64,
    pub disk: f64,
    pub ports: usize,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            cpus: 1.0,
            mem: 2048.0,
            disk: 20_000.0,
            ports: 3,
        }
    }
}

impl NodeDefaults {
    pub fn request(&self) -> NodeRequest {
        NodeRequest {
            cpus: self.cpus,
            mem: self.mem,
            disk: self.disk,
            ports: self.ports,
        }
    }
}

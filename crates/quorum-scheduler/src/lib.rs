//! quorum-scheduler — cluster lifecycle policy and task reconciliation.
//!
//! Keeps the framework's view of its tasks in line with the resource
//! manager. A background loop either requests reconciliation of tasks
//! whose state is unconfirmed, or, in steady state, terminates and
//! removes the nodes that cluster policy no longer wants and retires
//! clusters that have emptied out.
//!
//! # Components
//!
//! - **`ReconciliationServer`** — the enable-able reconcile-or-kill loop
//! - **`SchedulerCore`** — scheduler state behind its lock, plus persistence
//! - **`ManagedCluster`** / **`FrameworkCluster`** — node lifecycle policy
//! - **`SchedulerDriver`** — calls into the resource manager
//! - **`SchedulerConfig`** — TOML configuration
//!
//! # Architecture
//!
//! ```text
//! ReconciliationServer
//!   ├── enabled flag (lock-free)
//!   ├── SchedulerDriver (finish message, kill, reconcile)
//!   └── SchedulerCore
//!       ├── Mutex<SchedulerState<C>> (clusters + graveyard)
//!       └── Persister (full-state save)
//! ```

pub mod cluster;
pub mod config;
pub mod core;
pub mod driver;
pub mod error;
pub mod reconcile;

pub use cluster::{
    ClusterNode, Destination, FrameworkCluster, FrameworkNode, ManagedCluster, NodeState,
};
pub use config::{NodeDefaults, ReconcileConfig, SchedulerConfig, StateConfig};
pub use core::SchedulerCore;
pub use driver::{DriverError, DriverResult, DriverStatus, SchedulerDriver};
pub use error::{SchedulerError, SchedulerResult};
pub use reconcile::{ReconciliationServer, TickOutcome};

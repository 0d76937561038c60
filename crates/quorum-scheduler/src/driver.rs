//! Resource manager driver seam.
//!
//! The driver owns the connection to the cluster resource manager. The
//! scheduler only needs three calls from it; wire encoding and callbacks
//! live behind the implementation.

use std::fmt;

use thiserror::Error;

use quorum_state::{ExecutorId, SlaveId, TaskId, TaskStatus};

/// Lifecycle status of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    NotStarted,
    Running,
    Aborted,
    Stopped,
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Aborted => "aborted",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Errors returned by driver calls.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver is not in the running state; the call was not made.
    #[error("driver not running (status: {0})")]
    NotRunning(DriverStatus),

    /// The driver is running but the call failed.
    #[error("driver call failed: {0}")]
    Call(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Calls the scheduler makes into the resource manager.
///
/// Calls are synchronous and expected to return quickly; the
/// reconciliation loop makes them while holding the state lock.
pub trait SchedulerDriver: Send + Sync {
    /// Send an opaque message to an executor.
    fn send_framework_message(
        &self,
        executor_id: &ExecutorId,
        slave_id: &SlaveId,
        data: &str,
    ) -> DriverResult<()>;

    fn kill_task(&self, task_id: &TaskId) -> DriverResult<()>;

    /// Ask the resource manager to resend the status of these tasks.
    fn reconcile_tasks(&self, statuses: &[TaskStatus]) -> DriverResult<()>;
}

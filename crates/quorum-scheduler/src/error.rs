//! Scheduler error types.

use thiserror::Error;

use crate::driver::DriverStatus;

/// Errors that can occur during a reconciliation tick.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The driver stopped running. Continuing without it is unsafe, so
    /// the process is expected to exit.
    #[error("driver not running (status: {0})")]
    DriverNotRunning(DriverStatus),

    #[error("state store error: {0}")]
    State(#[from] quorum_state::StateError),
}

impl SchedulerError {
    /// True for errors the process must not continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DriverNotRunning(_))
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

//! Resource allocation error types.

use thiserror::Error;

/// Errors that can occur while carving resources out of an offer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("insufficient ports: requested {requested}, available {available}")]
    InsufficientPorts { requested: usize, available: usize },
}

pub type ResourceResult<T> = Result<T, ResourceError>;

//! Errors raised while saving or loading scheduler state.

use thiserror::Error;

/// Failures of the redb-backed state store. Payloads carry the
/// underlying error rendered as text.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open state store: {0}")]
    Open(String),

    #[error("state store transaction failed: {0}")]
    Transaction(String),

    #[error("state store table unavailable: {0}")]
    Table(String),

    #[error("reading scheduler state failed: {0}")]
    Read(String),

    #[error("writing scheduler state failed: {0}")]
    Write(String),

    /// The in-memory state could not be turned into a document.
    #[error("cannot encode scheduler state: {0}")]
    Encode(String),

    /// The persisted document does not match the state type.
    #[error("persisted scheduler state is unreadable: {0}")]
    Decode(String),
}

impl StateError {
    /// True when repeating the same operation may succeed. Encoding and
    /// decoding failures are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transaction(_) | Self::Read(_) | Self::Write(_)
        )
    }
}

pub type StateResult<T> = Result<T, StateError>;

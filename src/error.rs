//! Error types for replay operations

use thiserror::Error;

/// Result type alias for replay operations
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Errors surfaced by the replay manager and its stores
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Caller-supplied value outside its allowed range or set
    #[error("Validation error: {0}")]
    Validation(String),

    /// Event index outside `[0, len)`
    #[error("Invalid event index {index} (have {len} events)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Switcher unreachable or timed out
    #[error("Switcher unreachable: {0}")]
    Connection(String),

    /// Switcher reachable but the command returned a non-success status
    #[error("Switcher command {function} failed")]
    RemoteCommand { function: String },

    /// Local store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Coarse error category, for callers mapping errors onto their own transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Index,
    Connection,
    RemoteCommand,
    Persistence,
}

impl ReplayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReplayError::Validation(_) => ErrorKind::Validation,
            ReplayError::IndexOutOfRange { .. } => ErrorKind::Index,
            ReplayError::Connection(_) => ErrorKind::Connection,
            ReplayError::RemoteCommand { .. } => ErrorKind::RemoteCommand,
            ReplayError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub(crate) fn remote(function: &str) -> Self {
        ReplayError::RemoteCommand {
            function: function.to_string(),
        }
    }
}

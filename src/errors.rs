use thiserror::Error;

/// Error type that captures common engine failures.
///
/// Every variant is recoverable by the caller; nothing in this crate
/// terminates the process on error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required field is missing or malformed (empty rejection reason,
    /// non-positive amount, patch without effect).
    #[error("Validation failed: {0}")]
    Validation(String),
    /// A transition was attempted from a terminal status.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// A concurrent actor resolved the record first; re-fetch and redisplay.
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),
    /// The referenced record id is unknown to the store.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A record references an obligation that does not exist.
    #[error("Consistency violation: {0}")]
    Consistency(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

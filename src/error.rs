//! Error types for the tracklog poller.

/// Top-level error type for the poll/dedup/persist loop.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The record store cannot be opened, queried, or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A remote read failed: transport error, timeout, bad status, or a
    /// response body that does not have the expected shape.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid scheduler state transition.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for PollError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PollError>;

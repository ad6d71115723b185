//! Error types for the partitioned queue

use thiserror::Error;

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a blocking operation gave up waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Cause {
    /// The caller's scope was canceled
    #[error("scope canceled")]
    Canceled,

    /// The caller's scope reached its deadline
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The queue's lifetime scope fired
    #[error("queue closed")]
    Closed,
}

/// Error types that can occur in queue operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A blocking call was interrupted before it could make progress
    #[error("operation canceled: {0}")]
    Canceled(Cause),

    /// The forwarding thread of a new partition could not be started
    #[error("failed to spawn partition thread: {0}")]
    Spawn(String),
}

impl Error {
    /// Returns true if the error came from a fired scope
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled(_))
    }

    /// The cancellation cause, if any
    pub fn cause(&self) -> Option<Cause> {
        match self {
            Error::Canceled(cause) => Some(*cause),
            Error::Spawn(_) => None,
        }
    }
}

impl From<Cause> for Error {
    fn from(cause: Cause) -> Self {
        Error::Canceled(cause)
    }
}

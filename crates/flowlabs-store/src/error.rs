//! Error types for the storage layer.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record was not found.
    #[error("record not found")]
    NotFound,

    /// A local database error occurred.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The hosted backend could not be reached.
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The hosted backend rejected the request.
    #[error("backend returned {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message reported by the backend.
        message: String,
    },
}

impl StoreError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

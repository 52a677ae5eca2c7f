// Stowage Store Layer - Error Types
//
// Failures of the durable key-value capability. None of these ever reach the
// application runtime: the bridge degrades and keeps acknowledging.

use std::io;
use thiserror::Error;

/// Errors that can occur while talking to a durable store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store is disabled, missing, or refusing access
    #[error("Durable store unavailable: {0}")]
    Unavailable(String),

    /// Read or write failed part way
    #[error("Durable store I/O error: {0}")]
    Io(String),

    /// Stored bytes are not valid UTF-8 text
    #[error("Stored value for key '{0}' is not valid UTF-8")]
    InvalidEncoding(String),

    /// Key cannot be mapped onto this backend
    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

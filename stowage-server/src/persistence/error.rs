// Persistence bridge error types

use thiserror::Error;

/// Errors surfaced to whoever submits a value for persistence.
///
/// Store failures are deliberately absent: they are logged and reported on
/// the acknowledgment instead of being returned.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The submitted value has no JSON representation
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bridge side of the persist channel is gone
    #[error("Persistence bridge is no longer attached")]
    Detached,
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for BridgeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::Detached
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

//! Typed error enum for the service layer.
//!
//! The HTTP layer maps these to status codes without downcasting. Broadcast
//! failures only surface inside [`ServiceError::AllTransportsFailed`], since a
//! broadcast failure alone never fails a request.

use tablecall_core::CoreError;
use tablecall_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage operation failed (DB, not found, etc.).
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Caller provided invalid input (missing table, bad status).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The durable store does not know the requested call.
    #[error("not found: {0}")]
    NotFound(String),

    /// Neither transport accepted the change.
    #[error("all transports failed (broadcast: {broadcast}; store: {store})")]
    AllTransportsFailed { broadcast: String, store: String },
}

impl ServiceError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_transient(),
            Self::AllTransportsFailed { .. } => true,
            Self::InvalidInput(_) | Self::NotFound(_) => false,
        }
    }

    /// Whether this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Storage(e) => e.is_not_found(),
            _ => false,
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

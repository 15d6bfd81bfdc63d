//! Storage-layer errors.
//!
//! Gateways tell "unknown call", "try again later" and "broken row" apart by
//! variant alone.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The store holds no record with this id.
    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Query or driver failure.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A stored row does not decode into a call.
    #[error("data corruption: {context}")]
    DataCorruption {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Schema setup failed at startup.
    #[error("migration error: {0}")]
    Migration(String),

    /// Backend cannot be reached right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(sqlx::Error::Io(_)) | Self::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn call_not_found(id: &tablecall_core::CallId) -> Self {
        Self::NotFound { entity: "call", id: id.to_string() }
    }
}

/// SQLSTATE class 08 (connection exception) and 57P01 (admin shutdown).
fn is_connection_loss(code: &str) -> bool {
    code.starts_with("08") || code == "57P01"
}

/// Pool exhaustion and lost connections become `Unavailable`, everything
/// else stays `Database`.
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(err.to_string())
            },
            sqlx::Error::Database(db_err)
                if db_err.code().is_some_and(|code| is_connection_loss(&code)) =>
            {
                Self::Unavailable(db_err.message().to_owned())
            },
            _ => Self::Database(err),
        }
    }
}

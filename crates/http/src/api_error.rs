//! Typed API error for HTTP handlers.
//!
//! Converts domain errors into HTTP responses with a JSON body
//! `{"success": false, "error": "message"}`.
//!
//! `Internal` logs the real error server-side and returns a static message to
//! the client. No error detail leakage.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tablecall_core::TOTAL_FAILURE_MESSAGE;
use tablecall_service::ServiceError;
use tablecall_storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request: invalid input from caller.
    BadRequest(String),
    /// 404 Not Found: the call does not exist.
    NotFound(String),
    /// 500 Internal Server Error: unexpected failure. Details logged, not exposed.
    Internal(anyhow::Error),
    /// 503 Service Unavailable: transports could not take the request.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            },
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = serde_json::json!({"success": false, "error": message});
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(msg) => Self::BadRequest(msg),
            ServiceError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            ServiceError::Storage(StorageError::NotFound { entity, id }) => {
                Self::NotFound(format!("{entity} '{id}' not found"))
            },
            ServiceError::AllTransportsFailed { ref broadcast, ref store } => {
                tracing::error!(broadcast, store, "request failed on every transport");
                Self::ServiceUnavailable(TOTAL_FAILURE_MESSAGE.to_owned())
            },
            ref e if e.is_transient() => {
                tracing::warn!(error = %e, "transient backend failure");
                Self::ServiceUnavailable(TOTAL_FAILURE_MESSAGE.to_owned())
            },
            _ => Self::Internal(err.into()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ServiceError::from(err).into()
    }
}

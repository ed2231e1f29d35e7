//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rusqlite::ErrorCode;
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache server.
///
/// The carried strings are for logs only; responses never echo them.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Request body is not valid JSON or misses a required field
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Key not present in the store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Store could not be reached (pool exhausted, busy, I/O failure)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other failure reported by the store
    #[error("Store error: {0}")]
    StoreError(String),
}

impl CacheError {
    /// Returns true for failures a caller may retry as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }
}

// == Store Error Conversion ==
impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::OperationInterrupted
                | ErrorCode::OutOfMemory,
            ) => CacheError::StoreUnavailable(err.to_string()),
            _ => CacheError::StoreError(err.to_string()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CacheError::NotFound(_) => return StatusCode::NOT_FOUND.into_response(),
            CacheError::MalformedInput(_) => (StatusCode::BAD_REQUEST, "Malformed request body"),
            CacheError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable")
            }
            CacheError::StoreError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal store error")
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;

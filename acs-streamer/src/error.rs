//! Error types for acs-streamer
//!
//! [`StreamError`] covers the session and transfer paths; [`ApiError`] is the
//! HTTP-facing error returned by REST handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Session / transfer error
#[derive(Error, Debug)]
pub enum StreamError {
    /// Outbound write failed; the connection is presumed unusable
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound write did not complete in time
    #[error("Send timed out after {0:?}")]
    SendTimeout(Duration),

    /// Chunk read did not complete in time
    #[error("Read timed out after {0:?}")]
    ReadTimeout(Duration),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from acs-common (protocol encoding, library lookups)
    #[error(transparent)]
    Common(#[from] acs_common::Error),
}

/// Convenience Result type for session code
pub type Result<T> = std::result::Result<T, StreamError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;

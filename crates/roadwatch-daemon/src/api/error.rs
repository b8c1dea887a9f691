//! Error types for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use roadwatch_core::repair::RepairError;
use roadwatch_core::store::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by API handlers.
///
/// Every variant renders as `{"error": message}` with a non-2xx status.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The route or the requested record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request body could not be decoded.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// The store is temporarily unavailable; the request may be retried.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    ///
    /// - `NotFound`: 404 Not Found
    /// - `BadRequest`: 400 Bad Request
    /// - `Unavailable`: 503 Service Unavailable
    /// - `Internal`: 500 Internal Server Error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<RepairError> for ApiError {
    fn from(err: RepairError) -> Self {
        match err {
            RepairError::NotFound { id } => Self::NotFound(format!("repair tracker not found: {id}")),
            RepairError::Store(err) => err.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Store internals stay in the log, not in the response body.
        let message = match &self {
            Self::NotFound(message) => message.clone(),
            Self::BadRequest(_) => self.to_string(),
            Self::Unavailable(detail) | Self::Internal(detail) => {
                error!(status = status.as_u16(), error = %detail, "request failed");
                status
                    .canonical_reason()
                    .unwrap_or("Internal Server Error")
                    .to_string()
            },
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

//! HTTP mapping of handler failures

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::common::Error;

/// Error returned by control server handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server no longer accepts state-changing verbs
    #[error("Server is shutting down")]
    ShuttingDown,

    /// Malformed request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Query string that cannot be decoded
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// An execution context error
    #[error(transparent)]
    Context(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE.into_response(),
            // The protocol defines an empty body for a rejected restart.
            ApiError::Context(Error::LaunchModeUnsupported(mode)) => {
                tracing::warn!(mode = %mode, "Rejected restart");
                StatusCode::BAD_REQUEST.into_response()
            }
            ApiError::InvalidQuery(message) => {
                tracing::warn!(error = %message, "Rejected restart query");
                StatusCode::BAD_REQUEST.into_response()
            }
            ApiError::BadRequest(message) => {
                tracing::warn!(error = %message, "Bad request");
                (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": message }))).into_response()
            }
            ApiError::Context(e) => {
                tracing::error!(error = %e, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub mod analyze;
pub mod chat;
pub mod health;
pub mod metrics;
pub mod upload;

/// JSON error body returned by every API endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API-level failures, mapped onto the HTTP error contract.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request fields. User-correctable.
    #[error("{0}")]
    Validation(String),

    /// Duplicate job id. Not retried automatically; the caller needs a
    /// fresh job id.
    #[error("{message}")]
    Conflict { message: String, details: String },

    #[error("not found")]
    NotFound,

    #[error("unsupported media type")]
    UnsupportedMedia,

    /// Configuration or upstream failure, surfaced generically.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: format!("Bad Request: {message}"),
                    details: None,
                },
            ),
            ApiError::Conflict { message, details } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    error: message,
                    details: Some(details),
                },
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "Not Found".to_string(),
                    details: None,
                },
            ),
            ApiError::UnsupportedMedia => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorBody {
                    error: "Unsupported media type: expected a JPEG, PNG or WebP image".to_string(),
                    details: None,
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: format!("Internal Server Error: {message}"),
                    details: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

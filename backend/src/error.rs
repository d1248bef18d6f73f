//! HTTP-facing error type.
//!
//! Existing clients depend on the exact status codes and on whether a failure
//! is reported under an `error` or a `message` key, so each endpoint picks the
//! variant that reproduces its established reply.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing required field. 400 with an `error` body.
    #[error("{0}")]
    Validation(String),

    /// Unknown record. 404 with an `error` body.
    #[error("{0}")]
    NotFound(String),

    /// Duplicate record. 409 with an `error` body.
    #[error("{0}")]
    Conflict(String),

    /// Missing or rejected bearer token. 401 with an `error` body.
    #[error("{message}")]
    Unauthorized {
        message: String,
        details: Option<String>,
    },

    /// Any other failure, reported under a `message` key.
    #[error("{1}")]
    Message(StatusCode, String),
}

impl ApiError {
    pub fn bad_request(message: impl ToString) -> Self {
        ApiError::Message(StatusCode::BAD_REQUEST, message.to_string())
    }

    pub fn internal(message: impl ToString) -> Self {
        ApiError::Message(StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Message(status, _) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthorized {
                message,
                details: Some(details),
            } => json!({ "error": message, "details": details }),
            ApiError::Message(_, message) => json!({ "message": message }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

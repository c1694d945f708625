//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::remote::RemoteError;

/// Why a protected request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization: Bearer ...` header
    MissingToken,
    /// Token did not decode to `username:password`
    MalformedToken,
    /// Token decoded to credentials that do not match
    InvalidToken,
    /// Login with wrong credentials
    InvalidCredentials,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "Authentication token required",
            AuthFailure::MalformedToken => "Malformed token",
            AuthFailure::InvalidToken => "Invalid token",
            AuthFailure::InvalidCredentials => "Invalid username or password",
        }
    }
}

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.message())]
    Unauthorized(AuthFailure),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Route not found")]
    NotFound,

    /// Remote command could not run or reported failure
    #[error("{message}: {details}")]
    Remote { message: String, details: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Remote failure with a human-readable summary
    pub fn remote(message: impl Into<String>, err: &RemoteError) -> Self {
        ApiError::Remote {
            message: message.into(),
            details: err.to_string(),
        }
    }

    /// Command ran but exited non-zero; stderr becomes the detail
    pub fn command_failed(message: impl Into<String>, stderr: &str) -> Self {
        ApiError::Remote {
            message: message.into(),
            details: stderr.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(failure) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new(failure.message()),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorResponse::new("Route not found")),
            ApiError::Remote { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(message).with_details(details),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{Denial, UNAUTHORIZED_MESSAGE};

/// Message sent for every 500 whose cause must not reach the client.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Caller lacks a session, the right identity, or the right role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Session lookup failed.
    #[error("Session error: {0}")]
    Session(#[from] kb_session::Error),

    /// Roster or credential lookup failed.
    #[error("Lookup error: {0}")]
    Lookup(#[from] kb_types::LookupError),

    /// An operation failed; `message` is safe to show, `detail` is not.
    #[error("{message}: {detail}")]
    Failed {
        message: &'static str,
        detail: String,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Denial> for ServerError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthorized(message) => ServerError::Unauthorized(message),
            Denial::Internal(detail) => ServerError::Internal(detail),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body. `code` mirrors the HTTP status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: status.as_u16(),
        }
    }
}

impl ServerError {
    /// Status code and client-facing message.
    fn public(&self) -> (StatusCode, String) {
        match self {
            ServerError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            ServerError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ServerError::Session(e) if e.is_not_found() => {
                (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string())
            }
            ServerError::Failed { message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
            ServerError::Session(_) | ServerError::Lookup(_) | ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = self.public();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Server error");
        } else {
            tracing::warn!(status = %status, error = %self, "Client error");
        }

        (status, Json(ErrorResponse::new(status, message))).into_response()
    }
}

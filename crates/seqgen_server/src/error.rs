//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use seqgen_core::CoreError;
use thiserror::Error;

use crate::response::SequenceResponse;
use crate::ACCESS_LOG_TARGET;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving requests.
#[derive(Error, Debug)]
pub enum ServerError {
    /// No route matches the path.
    #[error("404 method not found")]
    NotFound,

    /// The route exists but not for this method.
    #[error("405 method not allowed")]
    MethodNotAllowed,

    /// Malformed path or body.
    #[error("{0}")]
    InvalidRequest(String),

    /// The engine rejected or failed the operation.
    #[error(transparent)]
    Engine(#[from] CoreError),

    /// The request did not finish within the configured timeout.
    #[error("503 request timed out")]
    Timeout,

    /// Invalid server configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Engine(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ServerError::Engine(CoreError::EngineStopped) | ServerError::Timeout => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Engine(_)
            | ServerError::Config(_)
            | ServerError::Internal(_)
            | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(target: ACCESS_LOG_TARGET, status = status.as_u16(), error = %self, "request failed");

        // Server faults are reported generically; the detail is in the log.
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "500 Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(SequenceResponse::error(error))).into_response()
    }
}

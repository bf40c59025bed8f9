//! Error types for monitor operations

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Requested record is not in the current snapshot (never existed or evicted)
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Mutating endpoint called with a non-mutating verb
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// HTTP status code this error maps to when surfaced through the API
    pub fn status_code(&self) -> StatusCode {
        match self {
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            MonitorError::Configuration(_)
            | MonitorError::Network(_)
            | MonitorError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

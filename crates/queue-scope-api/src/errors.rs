//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use queue_scope_runtime::BackendError;
use tracing::{error, warn};

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Request handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: malformed JSON, invalid query parameters, or a retry
///   whose target queue cannot be inferred
/// - `404 Not Found`: a queue path that names no known sub-resource
/// - `405 Method Not Allowed`: a known sub-resource used with the wrong verb
/// - `500 Internal Server Error`: any backend failure, with its message
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON body: {message}")]
    InvalidJson { message: String },

    #[error("Invalid query parameter: {message}")]
    InvalidQuery { message: String },

    /// Retry without an explicit target on a queue no source redrives into
    #[error("No targetQueueUrl given and no source queue redrives into {queue_url}")]
    RetryTargetUnknown { queue_url: String },

    #[error("Unknown resource: {path}")]
    NotFound { path: String },

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidJson { .. }
            | Self::InvalidQuery { .. }
            | Self::RetryTargetUnknown { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!(error = %message, "Backend request failed");
        } else {
            warn!(status = %status, error = %message, "Rejected request");
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// A push-channel frame the server could not act on.
///
/// The frame is dropped; the connection stays open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {message}")]
    Malformed { message: String },

    #[error("Unsupported {kind} frame")]
    Unsupported { kind: &'static str },
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Live mode was forced but the backend could not be reached
    #[error("Queue backend unavailable: {message}")]
    BackendUnavailable { message: String },
}

impl ServiceError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ServerFailed { .. } => 1,
            Self::BindFailed { .. } => 2,
            Self::Configuration(_) => 3,
            Self::BackendUnavailable { .. } => 4,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

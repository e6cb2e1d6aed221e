//! Error types for backend operations.

use thiserror::Error;

/// Failure reported by a queue backend.
///
/// Every gateway operation fails with this type. The variants follow the
/// coarse categories the console cares about: network trouble, throttling,
/// missing resources and permissions. Service-specific codes that do not fit
/// a category are carried verbatim in [`BackendError::Service`].
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request throttled: {message}")]
    Throttled { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// The queue or message no longer exists, or a receipt handle expired.
    #[error("{resource} not found: {message}")]
    NotFound { resource: String, message: String },

    #[error("Backend service error ({code}): {message}")]
    Service { code: String, message: String },

    #[error("Invalid backend response: {message}")]
    InvalidResponse { message: String },

    #[error("Backend configuration error: {message}")]
    Configuration { message: String },
}

impl BackendError {
    /// Build a [`BackendError::NotFound`] for a queue.
    pub fn queue_not_found(queue_url: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "Queue".to_string(),
            message: queue_url.into(),
        }
    }

    /// Build a [`BackendError::NotFound`] for a receipt handle.
    pub fn receipt_not_found(receipt_handle: impl Into<String>) -> Self {
        Self::NotFound {
            resource: "Receipt handle".to_string(),
            message: receipt_handle.into(),
        }
    }

    /// Check whether the error means the target is already gone.
    ///
    /// Callers deleting messages treat this as success.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Throttled { .. } => true,
            Self::PermissionDenied { .. } => false,
            Self::NotFound { .. } => false,
            Self::Service { .. } => true,
            Self::InvalidResponse { .. } => false,
            Self::Configuration { .. } => false,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

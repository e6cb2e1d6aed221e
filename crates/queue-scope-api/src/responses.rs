//! Request bodies, query parameters and response types for the API.

use queue_scope_core::Message;
use serde::{Deserialize, Serialize};

// ============================================================================
// Query Parameters
// ============================================================================

/// Query for `GET /api/queues`
#[derive(Debug, Default, Deserialize)]
pub struct ListQueuesQuery {
    pub limit: Option<u32>,
}

/// Query for `GET /api/queues/{queueUrl}/messages`
///
/// `offset` is only reliable against a backend that returns the same
/// messages on every receive, such as the demo backend.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<u32>,
    pub offset: Option<usize>,
}

// ============================================================================
// Request Bodies
// ============================================================================

/// Body of `POST /api/queues/{queueUrl}/messages`
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// Body of `POST /api/queues/{queueUrl}/retry`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryRequest {
    pub message: Message,
    /// Inferred from the queue's redrive source when absent or empty
    #[serde(default)]
    pub target_queue_url: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryResponse {
    pub message_id: String,
    pub status: String,
    pub target_queue_url: String,
    /// `false` when the original could not be deleted and now exists in
    /// both queues
    pub source_deleted: bool,
}

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub mode: queue_scope_runtime::BackendMode,
    pub live_tail_sessions: usize,
}

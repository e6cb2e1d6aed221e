//! The backend capability trait.

use crate::error::BackendError;
use crate::message::ReceivedMessage;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

/// Capability interface over a remote queueing service.
///
/// Implemented by the live SQS adapter and by the in-memory demo backend.
/// One implementation is selected at startup; everything upstream depends on
/// `Arc<dyn QueueBackend>` only.
///
/// Queues are identified by their opaque URL.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// List queue URLs, at most `max_results` of them.
    async fn list_queues(&self, max_results: u32) -> Result<Vec<String>, BackendError>;

    /// Fetch all attributes of a queue.
    async fn get_queue_attributes(
        &self,
        queue_url: &str,
    ) -> Result<HashMap<String, String>, BackendError>;

    /// Fetch the tags attached to a queue.
    async fn list_queue_tags(
        &self,
        queue_url: &str,
    ) -> Result<HashMap<String, String>, BackendError>;

    /// Receive up to `max_count` messages, long-polling for `wait_seconds`.
    ///
    /// Best effort: may return fewer messages than exist, or none at all.
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_count: u32,
        wait_seconds: u32,
    ) -> Result<Vec<ReceivedMessage>, BackendError>;

    /// Send a message, returning the backend-assigned message ID.
    async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError>;

    /// Delete one delivery of a message using its receipt handle.
    ///
    /// Fails with [`BackendError::NotFound`] when the handle is unknown or
    /// expired.
    async fn delete_message(&self, queue_url: &str, receipt_handle: &str)
        -> Result<(), BackendError>;
}

/// Which kind of backend the console is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendMode {
    Demo,
    Live,
}

/// Description of the selected backend, as shown to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendContext {
    pub mode: BackendMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl BackendContext {
    /// Context for the demo backend.
    pub fn demo() -> Self {
        Self {
            mode: BackendMode::Demo,
            region: None,
            profile: None,
            account_id: None,
        }
    }
}

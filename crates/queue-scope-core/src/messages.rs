//! Message access: browse, send, delete, retry and queue statistics.

use crate::model::{
    count_attribute, derive_queue_name, is_dead_letter_queue, normalize_messages,
    timestamp_attribute, DlqStatistics, Message, QueueStatistics, RedrivePolicy,
};
use queue_scope_runtime::{attribute_names, BackendError, QueueBackend};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;

/// Most messages the backend returns from a single receive.
pub const MAX_MESSAGES_PER_RECEIVE: u32 = 10;

/// Result of retrying a message into another queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    /// ID of the copy sent to the target queue
    pub message_id: String,
    /// Whether the original was removed from the source queue
    pub source_deleted: bool,
}

/// Reads and mutates queue contents through the backend.
pub struct MessageService {
    backend: Arc<dyn QueueBackend>,
    receive_wait_seconds: u32,
}

impl MessageService {
    pub fn new(backend: Arc<dyn QueueBackend>, receive_wait_seconds: u32) -> Self {
        Self {
            backend,
            receive_wait_seconds,
        }
    }

    /// Fetch a page of messages, newest first.
    ///
    /// Receives one batch, sorts it by send time, drops `offset` messages
    /// and returns at most `limit` (capped at 10). Pages are only consistent
    /// with each other when the backend returns a stable snapshot.
    pub async fn get_messages(
        &self,
        queue_url: &str,
        limit: u32,
        offset: usize,
    ) -> Result<Vec<Message>, BackendError> {
        let limit = limit.min(MAX_MESSAGES_PER_RECEIVE) as usize;
        let raw = self
            .backend
            .receive_messages(queue_url, MAX_MESSAGES_PER_RECEIVE, self.receive_wait_seconds)
            .await?;

        let messages: Vec<Message> = normalize_messages(raw)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect();

        debug!(queue_url = %queue_url, returned = messages.len(), "Fetched messages");
        Ok(messages)
    }

    pub async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError> {
        let message_id = self.backend.send_message(queue_url, body).await?;
        info!(queue_url = %queue_url, message_id = %message_id, "Sent message");
        Ok(message_id)
    }

    /// Delete a message delivery.
    ///
    /// A message that is already gone counts as deleted.
    pub async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), BackendError> {
        match self.backend.delete_message(queue_url, receipt_handle).await {
            Ok(()) => {
                info!(queue_url = %queue_url, "Deleted message");
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                warn!(queue_url = %queue_url, error = %error, "Message already deleted");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Move a message to `target_queue_url`: send its body there, then
    /// delete it from `source_queue_url`.
    ///
    /// The two steps are not atomic. A failed send fails the retry and
    /// leaves the source untouched. A failed delete is logged and the retry
    /// still succeeds; the message then exists in both queues.
    pub async fn retry_message(
        &self,
        source_queue_url: &str,
        message: &Message,
        target_queue_url: &str,
    ) -> Result<RetryOutcome, BackendError> {
        let message_id = self
            .backend
            .send_message(target_queue_url, &message.body)
            .await?;

        let source_deleted = match self
            .backend
            .delete_message(source_queue_url, &message.receipt_handle)
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    source_queue_url = %source_queue_url,
                    target_queue_url = %target_queue_url,
                    original_message_id = %message.message_id,
                    error = %error,
                    "Retried message could not be removed from the source queue; it now exists in both queues"
                );
                false
            }
        };

        info!(
            source_queue_url = %source_queue_url,
            target_queue_url = %target_queue_url,
            original_message_id = %message.message_id,
            message_id = %message_id,
            source_deleted = source_deleted,
            "Retried message"
        );

        Ok(RetryOutcome {
            message_id,
            source_deleted,
        })
    }

    /// Summarise a queue's counts and, for dead-letter queues, a sample of
    /// its messages.
    ///
    /// A failed sample only drops the dead-letter block.
    pub async fn get_queue_statistics(
        &self,
        queue_url: &str,
    ) -> Result<QueueStatistics, BackendError> {
        let attributes = self.backend.get_queue_attributes(queue_url).await?;
        let queue_name = derive_queue_name(queue_url, &attributes);
        let is_dlq = is_dead_letter_queue(&queue_name, &attributes);

        let dlq_statistics = if is_dlq {
            match self
                .backend
                .receive_messages(queue_url, MAX_MESSAGES_PER_RECEIVE, self.receive_wait_seconds)
                .await
            {
                Ok(raw) => Some(DlqStatistics::from_sample(&normalize_messages(raw))),
                Err(error) => {
                    warn!(queue_url = %queue_url, error = %error, "Failed to sample dead-letter messages");
                    None
                }
            }
        } else {
            None
        };

        Ok(QueueStatistics {
            total_messages: count_attribute(
                &attributes,
                attribute_names::APPROXIMATE_NUMBER_OF_MESSAGES,
            ),
            messages_in_flight: count_attribute(
                &attributes,
                attribute_names::APPROXIMATE_NUMBER_OF_MESSAGES_NOT_VISIBLE,
            ),
            messages_delayed: count_attribute(
                &attributes,
                attribute_names::APPROXIMATE_NUMBER_OF_MESSAGES_DELAYED,
            ),
            is_dlq,
            created_timestamp: timestamp_attribute(&attributes, attribute_names::CREATED_TIMESTAMP),
            last_modified_timestamp: timestamp_attribute(
                &attributes,
                attribute_names::LAST_MODIFIED_TIMESTAMP,
            ),
            redrive: attributes
                .get(attribute_names::REDRIVE_POLICY)
                .and_then(|raw| RedrivePolicy::parse(raw)),
            dlq_statistics,
            queue_name,
        })
    }
}

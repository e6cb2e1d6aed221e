//! In-memory demo backend.
//!
//! Serves a small set of fixture queues so the console can run without
//! credentials. The fixtures are shaped like real SQS data:
//! - Queue URLs and ARNs in the usual account/region layout
//! - Source queues linked to their dead-letter queues by a redrive policy
//! - Dead-letter messages with distinct receive counts and `ErrorType`
//!   attributes
//!
//! Timestamps are relative to the moment the backend was constructed.
//!
//! Unlike SQS, receiving does not hide messages. Every receive returns the
//! same snapshot in the same order until a send or delete changes it, which
//! makes offset pagination stable against this backend. A receive yields the
//! most recently added messages first, so a full queue never hides a new one.

use crate::backend::QueueBackend;
use crate::error::BackendError;
use crate::message::{attribute_names, ReceivedMessage};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(test)]
#[path = "demo_tests.rs"]
mod tests;

const DEMO_REGION: &str = "us-east-1";
const DEMO_ACCOUNT: &str = "123456789012";

const DEFAULT_VISIBILITY_TIMEOUT: &str = "30";
const DEFAULT_RETENTION_PERIOD: &str = "345600";

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// All demo queues, in creation order.
#[derive(Default)]
struct DemoStorage {
    queues: Vec<DemoQueue>,
}

impl DemoStorage {
    fn queue(&self, queue_url: &str) -> Result<&DemoQueue, BackendError> {
        self.queues
            .iter()
            .find(|q| q.url == queue_url)
            .ok_or_else(|| BackendError::queue_not_found(queue_url))
    }

    fn queue_mut(&mut self, queue_url: &str) -> Result<&mut DemoQueue, BackendError> {
        self.queues
            .iter_mut()
            .find(|q| q.url == queue_url)
            .ok_or_else(|| BackendError::queue_not_found(queue_url))
    }
}

struct DemoQueue {
    name: String,
    url: String,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
    /// Static attributes such as redrive policies
    extra_attributes: HashMap<String, String>,
    tags: HashMap<String, String>,
    messages: Vec<StoredMessage>,
}

impl DemoQueue {
    fn new(name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            url: queue_url(name),
            created_at,
            last_modified_at: created_at,
            extra_attributes: HashMap::new(),
            tags: HashMap::new(),
            messages: Vec::new(),
        }
    }

    fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.extra_attributes.insert(name.to_string(), value.into());
        self
    }

    fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    fn with_message(mut self, message: StoredMessage) -> Self {
        self.messages.push(message);
        self
    }

    fn attributes(&self) -> HashMap<String, String> {
        let mut attributes = self.extra_attributes.clone();
        attributes.insert(attribute_names::QUEUE_ARN.to_string(), queue_arn(&self.name));
        attributes.insert(
            attribute_names::APPROXIMATE_NUMBER_OF_MESSAGES.to_string(),
            self.messages.len().to_string(),
        );
        attributes.insert(
            attribute_names::APPROXIMATE_NUMBER_OF_MESSAGES_NOT_VISIBLE.to_string(),
            "0".to_string(),
        );
        attributes.insert(
            attribute_names::APPROXIMATE_NUMBER_OF_MESSAGES_DELAYED.to_string(),
            "0".to_string(),
        );
        attributes.insert(
            attribute_names::CREATED_TIMESTAMP.to_string(),
            self.created_at.timestamp().to_string(),
        );
        attributes.insert(
            attribute_names::LAST_MODIFIED_TIMESTAMP.to_string(),
            self.last_modified_at.timestamp().to_string(),
        );
        attributes.insert(
            attribute_names::VISIBILITY_TIMEOUT.to_string(),
            DEFAULT_VISIBILITY_TIMEOUT.to_string(),
        );
        attributes.insert(
            attribute_names::MESSAGE_RETENTION_PERIOD.to_string(),
            DEFAULT_RETENTION_PERIOD.to_string(),
        );
        attributes
    }
}

/// A message held by a demo queue
#[derive(Clone)]
struct StoredMessage {
    message_id: String,
    body: String,
    sent_at: DateTime<Utc>,
    receive_count: u32,
    message_attributes: HashMap<String, String>,
}

impl StoredMessage {
    fn new(message_id: &str, body: &str, sent_at: DateTime<Utc>, receive_count: u32) -> Self {
        Self {
            message_id: message_id.to_string(),
            body: body.to_string(),
            sent_at,
            receive_count,
            message_attributes: HashMap::new(),
        }
    }

    fn with_error_type(mut self, error_type: &str) -> Self {
        self.message_attributes.insert(
            attribute_names::ERROR_TYPE.to_string(),
            error_type.to_string(),
        );
        self
    }

    /// Receipt handles never expire here, so one per message is enough.
    fn receipt_handle(&self) -> String {
        format!("demo-receipt-{}", self.message_id)
    }

    fn to_received(&self) -> ReceivedMessage {
        let mut attributes = HashMap::new();
        attributes.insert(
            attribute_names::SENT_TIMESTAMP.to_string(),
            self.sent_at.timestamp_millis().to_string(),
        );
        attributes.insert(
            attribute_names::APPROXIMATE_RECEIVE_COUNT.to_string(),
            self.receive_count.to_string(),
        );
        attributes.insert(
            attribute_names::APPROXIMATE_FIRST_RECEIVE_TIMESTAMP.to_string(),
            self.sent_at.timestamp_millis().to_string(),
        );
        attributes.insert(attribute_names::SENDER_ID.to_string(), DEMO_ACCOUNT.to_string());

        ReceivedMessage {
            message_id: Some(self.message_id.clone()),
            body: Some(self.body.clone()),
            receipt_handle: Some(self.receipt_handle()),
            attributes,
            message_attributes: self.message_attributes.clone(),
        }
    }
}

fn queue_url(name: &str) -> String {
    format!(
        "https://sqs.{}.amazonaws.com/{}/{}",
        DEMO_REGION, DEMO_ACCOUNT, name
    )
}

fn queue_arn(name: &str) -> String {
    format!("arn:aws:sqs:{}:{}:{}", DEMO_REGION, DEMO_ACCOUNT, name)
}

fn redrive_policy(dead_letter_queue: &str, max_receive_count: u32) -> String {
    serde_json::json!({
        "deadLetterTargetArn": queue_arn(dead_letter_queue),
        "maxReceiveCount": max_receive_count,
    })
    .to_string()
}

fn fixture_queues(now: DateTime<Utc>) -> Vec<DemoQueue> {
    let minutes_ago = |m: i64| now - Duration::minutes(m);
    let days_ago = |d: i64| now - Duration::days(d);

    vec![
        DemoQueue::new("orders-queue", days_ago(30))
            .with_attribute(
                attribute_names::REDRIVE_POLICY,
                redrive_policy("deadletter-queue", 3),
            )
            .with_tag("Environment", "production")
            .with_tag("Team", "checkout")
            .with_message(StoredMessage::new(
                "3f6c2a1e-8d4b-4c1a-9e2f-0a1b2c3d4e01",
                r#"{"orderId":"ORD-1001","customerId":"C-88","total":129.99,"status":"created"}"#,
                minutes_ago(45),
                1,
            ))
            .with_message(StoredMessage::new(
                "3f6c2a1e-8d4b-4c1a-9e2f-0a1b2c3d4e02",
                r#"{"orderId":"ORD-1002","customerId":"C-12","total":15.50,"status":"created"}"#,
                minutes_ago(15),
                1,
            ))
            .with_message(StoredMessage::new(
                "3f6c2a1e-8d4b-4c1a-9e2f-0a1b2c3d4e03",
                r#"{"orderId":"ORD-1003","customerId":"C-41","total":72.00,"status":"created"}"#,
                minutes_ago(5),
                1,
            )),
        DemoQueue::new("payments-queue", days_ago(21))
            .with_attribute(
                attribute_names::REDRIVE_POLICY,
                redrive_policy("payments-queue-dlq", 5),
            )
            .with_tag("Environment", "production")
            .with_tag("Team", "payments")
            .with_message(StoredMessage::new(
                "7b1d9e40-5a2c-4f3e-8b6d-1c2d3e4f5a01",
                r#"{"paymentId":"PAY-501","orderId":"ORD-0998","amount":49.00,"currency":"USD"}"#,
                minutes_ago(32),
                1,
            ))
            .with_message(StoredMessage::new(
                "7b1d9e40-5a2c-4f3e-8b6d-1c2d3e4f5a02",
                r#"{"paymentId":"PAY-502","orderId":"ORD-0999","amount":310.25,"currency":"EUR"}"#,
                minutes_ago(8),
                2,
            )),
        DemoQueue::new("deadletter-queue", days_ago(30))
            .with_attribute(
                attribute_names::REDRIVE_ALLOW_POLICY,
                r#"{"redrivePermission":"allowAll"}"#,
            )
            .with_tag("Environment", "production")
            .with_tag("Team", "checkout")
            .with_message(
                StoredMessage::new(
                    "c4e8f1a2-6b3d-4e5f-9a0b-2d3e4f5a6b01",
                    r#"{"orderId":"ORD-0950","customerId":"C-07","total":-4.00,"status":"created"}"#,
                    minutes_ago(180),
                    3,
                )
                .with_error_type("ValidationError"),
            )
            .with_message(
                StoredMessage::new(
                    "c4e8f1a2-6b3d-4e5f-9a0b-2d3e4f5a6b02",
                    r#"{"orderId":"ORD-0961","customerId":"C-19","total":88.10,"status":"created"}"#,
                    minutes_ago(95),
                    4,
                )
                .with_error_type("TimeoutError"),
            )
            .with_message(
                StoredMessage::new(
                    "c4e8f1a2-6b3d-4e5f-9a0b-2d3e4f5a6b03",
                    r#"{"orderId":"ORD-0977","customerId":null,"total":12.00,"status":"created"}"#,
                    minutes_ago(60),
                    5,
                )
                .with_error_type("ValidationError"),
            ),
        DemoQueue::new("payments-queue-dlq", days_ago(21))
            .with_tag("Environment", "staging")
            .with_tag("Team", "payments")
            .with_message(StoredMessage::new(
                "e9a0b1c2-7d4e-4f6a-8b9c-3e4f5a6b7c01",
                r#"{"paymentId":"PAY-477","orderId":"ORD-0940","amount":0,"currency":"XXX"}"#,
                minutes_ago(240),
                6,
            )),
    ]
}

// ============================================================================
// Demo Backend
// ============================================================================

/// In-memory [`QueueBackend`] seeded with fixture queues.
///
/// Clones share the same storage.
#[derive(Clone)]
pub struct DemoBackend {
    storage: Arc<RwLock<DemoStorage>>,
}

impl DemoBackend {
    /// Create a backend seeded with the fixture queues.
    pub fn new() -> Self {
        Self::with_storage(DemoStorage {
            queues: fixture_queues(Utc::now()),
        })
    }

    /// Create a backend with no queues.
    pub fn empty() -> Self {
        Self::with_storage(DemoStorage::default())
    }

    fn with_storage(storage: DemoStorage) -> Self {
        Self {
            storage: Arc::new(RwLock::new(storage)),
        }
    }

    /// Add an empty queue, returning its URL.
    ///
    /// Adding a queue whose name already exists returns the existing URL.
    pub fn create_queue(&self, name: &str) -> String {
        let mut storage = self.write();
        if let Some(existing) = storage.queues.iter().find(|q| q.name == name) {
            return existing.url.clone();
        }

        let queue = DemoQueue::new(name, Utc::now());
        let url = queue.url.clone();
        storage.queues.push(queue);
        url
    }

    // A panic while holding the lock cannot leave the storage half-updated,
    // so poisoned guards are recovered rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, DemoStorage> {
        self.storage.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DemoStorage> {
        self.storage.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DemoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoBackend")
            .field("queues", &self.read().queues.len())
            .finish()
    }
}

#[async_trait]
impl QueueBackend for DemoBackend {
    async fn list_queues(&self, max_results: u32) -> Result<Vec<String>, BackendError> {
        Ok(self
            .read()
            .queues
            .iter()
            .take(max_results as usize)
            .map(|q| q.url.clone())
            .collect())
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
    ) -> Result<HashMap<String, String>, BackendError> {
        Ok(self.read().queue(queue_url)?.attributes())
    }

    async fn list_queue_tags(
        &self,
        queue_url: &str,
    ) -> Result<HashMap<String, String>, BackendError> {
        Ok(self.read().queue(queue_url)?.tags.clone())
    }

    /// Returns the most recently added `max_count` messages, newest first.
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_count: u32,
        _wait_seconds: u32,
    ) -> Result<Vec<ReceivedMessage>, BackendError> {
        let storage = self.read();
        let queue = storage.queue(queue_url)?;
        Ok(queue
            .messages
            .iter()
            .rev()
            .take(max_count as usize)
            .map(StoredMessage::to_received)
            .collect())
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError> {
        let mut storage = self.write();
        let queue = storage.queue_mut(queue_url)?;

        let now = Utc::now();
        let message_id = uuid::Uuid::new_v4().to_string();
        queue
            .messages
            .push(StoredMessage::new(&message_id, body, now, 1));
        queue.last_modified_at = now;

        Ok(message_id)
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), BackendError> {
        let mut storage = self.write();
        let queue = storage.queue_mut(queue_url)?;

        let position = queue
            .messages
            .iter()
            .position(|m| m.receipt_handle() == receipt_handle)
            .ok_or_else(|| BackendError::receipt_not_found(receipt_handle))?;
        queue.messages.remove(position);
        queue.last_modified_at = Utc::now();

        Ok(())
    }
}

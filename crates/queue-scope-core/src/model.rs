//! Canonical queue and message shapes served to the console.
//!
//! Raw backend data is normalised here: queue names are derived from the
//! ARN or URL, dead-letter queues are classified, and redrive policies are
//! parsed into typed form.

use queue_scope_runtime::{attribute_names, ReceivedMessage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;

/// Name suffix marking a queue as dead-letter by convention.
const DLQ_NAME_SUFFIX: &str = "-dlq";

// ============================================================================
// Messages
// ============================================================================

/// A message as shown in the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub body: String,
    pub receipt_handle: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// String-valued user attributes such as `ErrorType`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub message_attributes: HashMap<String, String>,
}

impl Message {
    /// Normalise a backend delivery.
    ///
    /// Returns `None` for deliveries without a message ID; they cannot be
    /// deduplicated or addressed and are dropped.
    pub fn from_received(raw: ReceivedMessage) -> Option<Self> {
        let message_id = raw.message_id.filter(|id| !id.is_empty())?;
        Some(Self {
            message_id,
            body: raw.body.unwrap_or_default(),
            receipt_handle: raw.receipt_handle.unwrap_or_default(),
            attributes: raw.attributes,
            message_attributes: raw.message_attributes,
        })
    }

    /// Send time in epoch milliseconds; missing or unparseable values are 0.
    pub fn sent_timestamp(&self) -> i64 {
        self.attributes
            .get(attribute_names::SENT_TIMESTAMP)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn receive_count(&self) -> Option<u32> {
        self.attributes
            .get(attribute_names::APPROXIMATE_RECEIVE_COUNT)
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn error_type(&self) -> Option<&str> {
        self.message_attributes
            .get(attribute_names::ERROR_TYPE)
            .map(String::as_str)
    }
}

/// Normalise a batch of deliveries and order them newest first.
///
/// The sort is stable, so messages with equal or missing send times keep
/// the order the backend returned them in.
pub fn normalize_messages(raw: Vec<ReceivedMessage>) -> Vec<Message> {
    let mut messages: Vec<Message> = raw.into_iter().filter_map(Message::from_received).collect();
    sort_newest_first(&mut messages);
    messages
}

pub fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.sent_timestamp().cmp(&a.sent_timestamp()));
}

// ============================================================================
// Queues
// ============================================================================

/// A queue entry in the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Queue {
    pub name: String,
    pub url: String,
    pub attributes: HashMap<String, String>,
    #[serde(rename = "isDLQ")]
    pub is_dlq: bool,
}

impl Queue {
    pub fn new(url: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        let url = url.into();
        let name = derive_queue_name(&url, &attributes);
        let is_dlq = is_dead_letter_queue(&name, &attributes);
        Self {
            name,
            url,
            attributes,
            is_dlq,
        }
    }

    pub fn arn(&self) -> Option<&str> {
        self.attributes
            .get(attribute_names::QUEUE_ARN)
            .map(String::as_str)
    }

    pub fn redrive_policy(&self) -> Option<RedrivePolicy> {
        self.attributes
            .get(attribute_names::REDRIVE_POLICY)
            .and_then(|raw| RedrivePolicy::parse(raw))
    }
}

/// Derive a display name for a queue.
///
/// Uses the text after the last `:` of the queue ARN when present, else the
/// text after the last `/` of the URL.
pub fn derive_queue_name(url: &str, attributes: &HashMap<String, String>) -> String {
    if let Some(arn) = attributes.get(attribute_names::QUEUE_ARN) {
        if let Some((_, name)) = arn.rsplit_once(':') {
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    let trimmed = url.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name.to_string(),
        None => trimmed.to_string(),
    }
}

/// Classify a queue as dead-letter.
///
/// A queue is dead-letter if it accepts inbound redrives
/// (`RedriveAllowPolicy` set) or its name ends in `-dlq`, ignoring case.
pub fn is_dead_letter_queue(name: &str, attributes: &HashMap<String, String>) -> bool {
    let allows_redrive = attributes
        .get(attribute_names::REDRIVE_ALLOW_POLICY)
        .is_some_and(|policy| !policy.trim().is_empty());

    allows_redrive || name.to_ascii_lowercase().ends_with(DLQ_NAME_SUFFIX)
}

/// A source queue's link to its dead-letter queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedrivePolicy {
    pub dead_letter_target_arn: String,
    pub max_receive_count: u32,
}

impl RedrivePolicy {
    /// Parse the JSON `RedrivePolicy` attribute.
    ///
    /// `maxReceiveCount` is accepted as a number or a numeric string; both
    /// forms occur in practice.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        let dead_letter_target_arn = value.get("deadLetterTargetArn")?.as_str()?.to_string();
        let max_receive_count = match value.get("maxReceiveCount")? {
            serde_json::Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
            serde_json::Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };

        Some(Self {
            dead_letter_target_arn,
            max_receive_count,
        })
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Summary of a queue's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatistics {
    pub queue_name: String,
    pub total_messages: u64,
    pub messages_in_flight: u64,
    pub messages_delayed: u64,
    #[serde(rename = "isDLQ")]
    pub is_dlq: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redrive: Option<RedrivePolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dlq_statistics: Option<DlqStatistics>,
}

/// Figures computed from a sample of a dead-letter queue's messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DlqStatistics {
    pub sampled_messages: usize,
    pub average_receive_count: f64,
    pub max_receive_count: u32,
    pub error_types: BTreeMap<String, u32>,
}

impl DlqStatistics {
    pub fn from_sample(sample: &[Message]) -> Self {
        let counts: Vec<u32> = sample.iter().filter_map(Message::receive_count).collect();
        let average_receive_count = if counts.is_empty() {
            0.0
        } else {
            counts.iter().map(|&c| f64::from(c)).sum::<f64>() / counts.len() as f64
        };

        let mut error_types = BTreeMap::new();
        for error_type in sample.iter().filter_map(Message::error_type) {
            *error_types.entry(error_type.to_string()).or_insert(0) += 1;
        }

        Self {
            sampled_messages: sample.len(),
            average_receive_count,
            max_receive_count: counts.iter().copied().max().unwrap_or(0),
            error_types,
        }
    }
}

/// Parse a numeric attribute, treating missing or malformed values as 0.
pub(crate) fn count_attribute(attributes: &HashMap<String, String>, name: &str) -> u64 {
    attributes
        .get(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

pub(crate) fn timestamp_attribute(attributes: &HashMap<String, String>, name: &str) -> Option<i64> {
    attributes.get(name).and_then(|v| v.trim().parse().ok())
}

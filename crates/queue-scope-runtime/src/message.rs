//! Message shapes as returned by a backend.

use std::collections::HashMap;

/// Well-known queue and message attribute names.
pub mod attribute_names {
    pub const QUEUE_ARN: &str = "QueueArn";
    pub const APPROXIMATE_NUMBER_OF_MESSAGES: &str = "ApproximateNumberOfMessages";
    pub const APPROXIMATE_NUMBER_OF_MESSAGES_NOT_VISIBLE: &str =
        "ApproximateNumberOfMessagesNotVisible";
    pub const APPROXIMATE_NUMBER_OF_MESSAGES_DELAYED: &str = "ApproximateNumberOfMessagesDelayed";
    pub const CREATED_TIMESTAMP: &str = "CreatedTimestamp";
    pub const LAST_MODIFIED_TIMESTAMP: &str = "LastModifiedTimestamp";
    pub const VISIBILITY_TIMEOUT: &str = "VisibilityTimeout";
    pub const MESSAGE_RETENTION_PERIOD: &str = "MessageRetentionPeriod";
    pub const REDRIVE_POLICY: &str = "RedrivePolicy";
    pub const REDRIVE_ALLOW_POLICY: &str = "RedriveAllowPolicy";

    pub const SENT_TIMESTAMP: &str = "SentTimestamp";
    pub const APPROXIMATE_RECEIVE_COUNT: &str = "ApproximateReceiveCount";
    pub const APPROXIMATE_FIRST_RECEIVE_TIMESTAMP: &str = "ApproximateFirstReceiveTimestamp";
    pub const SENDER_ID: &str = "SenderId";

    /// User-level message attribute carrying a failure category.
    pub const ERROR_TYPE: &str = "ErrorType";
}

/// A message delivery exactly as the backend reported it.
///
/// Fields the backend omitted stay `None`; normalisation into the canonical
/// message shape happens upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: Option<String>,
    pub body: Option<String>,
    pub receipt_handle: Option<String>,
    /// System attributes (`SentTimestamp`, `ApproximateReceiveCount`, ...)
    pub attributes: HashMap<String, String>,
    /// String-valued user attributes
    pub message_attributes: HashMap<String, String>,
}

impl ReceivedMessage {
    /// Look up a system attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

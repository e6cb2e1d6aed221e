//! Live tail: pushes new queue messages to connected viewers.
//!
//! Each viewer connection is a session. A session subscribes to queues; every
//! subscription runs its own polling task that receives from the backend on
//! a fixed interval and forwards only messages the session has not seen yet
//! for that queue.
//!
//! Events for a session flow through a single bounded channel so the
//! transport has exactly one writer per connection.

use crate::model::Message;
use serde::Serialize;
use std::time::Duration;

mod manager;
mod subscription;

pub use manager::{LiveTailManager, SessionHandle};

/// Polling settings shared by all subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTailConfig {
    pub poll_interval: Duration,
    /// Messages requested per poll
    pub max_messages: u32,
    /// Long-poll wait per receive
    pub wait_seconds: u32,
}

impl Default for LiveTailConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_messages: 10,
            wait_seconds: 1,
        }
    }
}

/// An event pushed to a live-tail session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TailEvent {
    /// First poll result of a subscription, sent even when empty.
    InitialMessages {
        #[serde(rename = "queueUrl")]
        queue_url: String,
        messages: Vec<Message>,
    },
    /// Messages not delivered before on this subscription.
    Messages {
        #[serde(rename = "queueUrl")]
        queue_url: String,
        messages: Vec<Message>,
    },
}

impl TailEvent {
    pub fn queue_url(&self) -> &str {
        match self {
            Self::InitialMessages { queue_url, .. } | Self::Messages { queue_url, .. } => {
                queue_url
            }
        }
    }

    pub fn messages(&self) -> &[Message] {
        match self {
            Self::InitialMessages { messages, .. } | Self::Messages { messages, .. } => messages,
        }
    }
}

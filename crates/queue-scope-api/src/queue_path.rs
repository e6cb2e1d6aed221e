//! Splits `/api/queues/{queueUrl}/...` paths into queue URL and resource.
//!
//! Queue URLs are full backend URLs, so they arrive as several path
//! segments, percent-encoded or not. Proxies and path normalisation may
//! also collapse the `//` after the scheme into a single slash.

use std::fmt;

#[cfg(test)]
#[path = "queue_path_tests.rs"]
mod tests;

/// The sub-resource a queue path names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueResource {
    Messages,
    Message { receipt_handle: String },
    Retry,
    Statistics,
}

impl fmt::Display for QueueResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages => write!(f, "messages"),
            Self::Message { .. } => write!(f, "messages/{{receiptHandle}}"),
            Self::Retry => write!(f, "retry"),
            Self::Statistics => write!(f, "statistics"),
        }
    }
}

/// A parsed queue path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePath {
    pub queue_url: String,
    pub resource: QueueResource,
}

const MESSAGE_SEPARATOR: &str = "/messages/";

impl QueuePath {
    /// Parse the part of the path after `/api/queues/`, already
    /// percent-decoded.
    ///
    /// Returns `None` when the path names no known sub-resource or the queue
    /// URL is empty.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/');

        let fixed_suffixes = [
            ("/messages", QueueResource::Messages),
            ("/retry", QueueResource::Retry),
            ("/statistics", QueueResource::Statistics),
        ];
        for (suffix, resource) in fixed_suffixes {
            if let Some(queue) = path.strip_suffix(suffix) {
                if let Some(queue_url) = restore_queue_url(queue) {
                    return Some(Self {
                        queue_url,
                        resource,
                    });
                }
            }
        }

        Self::parse_message(path)
    }

    /// Parse a `{queueUrl}/messages/{receiptHandle}` path only.
    ///
    /// Deletes use this so that a receipt handle ending in a resource name
    /// is not mistaken for that resource.
    pub fn parse_message(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/');
        let split = message_split_index(path)?;
        let receipt_handle = &path[split + MESSAGE_SEPARATOR.len()..];
        if receipt_handle.is_empty() {
            return None;
        }

        Some(Self {
            queue_url: restore_queue_url(&path[..split])?,
            resource: QueueResource::Message {
                receipt_handle: receipt_handle.to_string(),
            },
        })
    }
}

/// Where the queue URL ends in a `.../messages/{receiptHandle}` path.
///
/// Receipt handles may themselves contain `/`, and a queue may be named
/// `messages`, so the first separator that leaves a complete queue URL
/// (host, account and name) in front of it wins.
fn message_split_index(path: &str) -> Option<usize> {
    let candidates: Vec<usize> = path
        .match_indices(MESSAGE_SEPARATOR)
        .map(|(index, _)| index)
        .collect();

    candidates
        .iter()
        .copied()
        .find(|&index| has_account_and_name(&path[..index]))
        .or_else(|| candidates.first().copied())
}

fn has_account_and_name(queue: &str) -> bool {
    let Some((_, rest)) = queue.split_once(":/") else {
        return false;
    };
    let segments = rest.trim_start_matches('/').split('/').count();
    segments >= 3
}

/// Undo a collapsed `scheme://` and reject empty URLs.
fn restore_queue_url(queue: &str) -> Option<String> {
    let queue = queue.trim_end_matches('/');
    if queue.is_empty() {
        return None;
    }

    match queue.split_once(":/") {
        Some((scheme, rest)) if !rest.starts_with('/') => Some(format!("{scheme}://{rest}")),
        _ => Some(queue.to_string()),
    }
}

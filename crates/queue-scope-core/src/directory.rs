//! Queue directory: lists queues with their attributes and applies the
//! required-tag filter.

use crate::model::Queue;
use futures::future::join_all;
use queue_scope_runtime::{BackendError, QueueBackend};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;

/// Upper bound used when scanning every queue, e.g. to find a redrive source.
const SCAN_LIMIT: u32 = 1000;

/// Required tags a queue must carry to be listed.
///
/// Maps a tag key to the values accepted for it. A queue passes when, for
/// every key, it carries that tag with one of the accepted values. Keys are
/// matched exactly and values case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    required: HashMap<String, Vec<String>>,
}

impl TagFilter {
    pub fn new(required: HashMap<String, Vec<String>>) -> Self {
        let required = required
            .into_iter()
            .map(|(key, values)| {
                let values = values
                    .into_iter()
                    .map(|v| v.trim().to_lowercase())
                    .filter(|v| !v.is_empty())
                    .collect();
                (key, values)
            })
            .collect();
        Self { required }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    pub fn matches(&self, tags: &HashMap<String, String>) -> bool {
        self.required.iter().all(|(key, allowed)| {
            tags.get(key)
                .map(|value| value.trim().to_lowercase())
                .is_some_and(|value| allowed.contains(&value))
        })
    }
}

enum ListingOutcome {
    Listed(Queue),
    FilteredOut,
    /// The queue is still listed, but its lookup failed
    Partial(Queue, BackendError),
    Skipped(BackendError),
}

/// Lists queues known to the backend.
pub struct DirectoryService {
    backend: Arc<dyn QueueBackend>,
    tag_filter: Option<TagFilter>,
}

impl DirectoryService {
    /// Create a directory; an empty `tag_filter` disables filtering.
    pub fn new(backend: Arc<dyn QueueBackend>, tag_filter: Option<TagFilter>) -> Self {
        Self {
            backend,
            tag_filter: tag_filter.filter(|f| !f.is_empty()),
        }
    }

    pub fn is_filtering(&self) -> bool {
        self.tag_filter.is_some()
    }

    /// List up to `limit` queues with their attributes.
    ///
    /// Per-queue failures do not abort the listing: with a tag filter the
    /// queue is skipped, without one it is listed with the attributes that
    /// could be read. The call only fails when the backend cannot list
    /// queues or when every queue's lookup failed.
    pub async fn list_queues(&self, limit: u32) -> Result<Vec<Queue>, BackendError> {
        let urls = self.backend.list_queues(limit).await?;
        let total = urls.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let outcomes = join_all(urls.into_iter().map(|url| self.describe_queue(url))).await;

        let mut queues = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                ListingOutcome::Listed(queue) => queues.push(queue),
                ListingOutcome::FilteredOut => {}
                ListingOutcome::Partial(queue, error) => {
                    queues.push(queue);
                    failures.push(error);
                }
                ListingOutcome::Skipped(error) => failures.push(error),
            }
        }

        if failures.len() == total {
            if let Some(error) = failures.into_iter().next() {
                return Err(error);
            }
        }

        debug!(listed = queues.len(), total = total, "Listed queues");
        Ok(queues)
    }

    async fn describe_queue(&self, url: String) -> ListingOutcome {
        let attributes = self.backend.get_queue_attributes(&url).await;

        let Some(filter) = &self.tag_filter else {
            return match attributes {
                Ok(attributes) => ListingOutcome::Listed(Queue::new(url, attributes)),
                Err(error) => {
                    warn!(queue_url = %url, error = %error, "Failed to read queue attributes");
                    ListingOutcome::Partial(Queue::new(url, HashMap::new()), error)
                }
            };
        };

        let attributes = match attributes {
            Ok(attributes) => attributes,
            Err(error) => {
                warn!(queue_url = %url, error = %error, "Skipping queue: failed to read attributes");
                return ListingOutcome::Skipped(error);
            }
        };

        match self.backend.list_queue_tags(&url).await {
            Ok(tags) if filter.matches(&tags) => ListingOutcome::Listed(Queue::new(url, attributes)),
            Ok(_) => ListingOutcome::FilteredOut,
            Err(error) => {
                warn!(queue_url = %url, error = %error, "Skipping queue: failed to read tags");
                ListingOutcome::Skipped(error)
            }
        }
    }

    /// Find the queue whose redrive policy targets the given dead-letter
    /// queue.
    ///
    /// Queues whose attributes cannot be read are ignored. Returns `None`
    /// when the dead-letter queue has no ARN or no source points at it.
    pub async fn find_source_queue(&self, dlq_url: &str) -> Result<Option<Queue>, BackendError> {
        let dlq_attributes = self.backend.get_queue_attributes(dlq_url).await?;
        let dlq = Queue::new(dlq_url, dlq_attributes);
        let Some(dlq_arn) = dlq.arn().map(str::to_string) else {
            return Ok(None);
        };

        let urls = self.backend.list_queues(SCAN_LIMIT).await?;
        let candidates = urls.into_iter().filter(|url| url != dlq_url).map(|url| async move {
            match self.backend.get_queue_attributes(&url).await {
                Ok(attributes) => Some(Queue::new(url, attributes)),
                Err(error) => {
                    debug!(queue_url = %url, error = %error, "Ignoring queue while searching for redrive source");
                    None
                }
            }
        });

        let source = join_all(candidates).await.into_iter().flatten().find(|queue| {
            queue
                .redrive_policy()
                .is_some_and(|policy| policy.dead_letter_target_arn == dlq_arn)
        });

        Ok(source)
    }
}

//! One live-tail subscription: dedup state and its polling loop.

use super::{LiveTailConfig, TailEvent};
use crate::model::{normalize_messages, Message};
use queue_scope_runtime::QueueBackend;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;

/// What a subscription has already pushed.
///
/// Owned by the subscription's polling task alone.
#[derive(Debug)]
pub(crate) struct SubscriptionState {
    queue_url: String,
    delivered: HashSet<String>,
    first_poll_done: bool,
}

impl SubscriptionState {
    pub(crate) fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            delivered: HashSet::new(),
            first_poll_done: false,
        }
    }

    /// Fold one poll result into the state, returning the event to push.
    ///
    /// The first poll always yields `InitialMessages`, even when empty.
    /// Later polls yield `Messages` with only unseen IDs, or nothing.
    pub(crate) fn absorb(&mut self, messages: Vec<Message>) -> Option<TailEvent> {
        let fresh: Vec<Message> = messages
            .into_iter()
            .filter(|m| self.delivered.insert(m.message_id.clone()))
            .collect();

        if !self.first_poll_done {
            self.first_poll_done = true;
            return Some(TailEvent::InitialMessages {
                queue_url: self.queue_url.clone(),
                messages: fresh,
            });
        }

        if fresh.is_empty() {
            return None;
        }

        Some(TailEvent::Messages {
            queue_url: self.queue_url.clone(),
            messages: fresh,
        })
    }

    pub(crate) fn delivered_count(&self) -> usize {
        self.delivered.len()
    }
}

/// Poll `queue_url` until `token` is cancelled or the session's event
/// channel closes.
///
/// The first poll runs immediately. Receive failures are logged and the
/// loop waits for the next tick.
pub(crate) async fn run_subscription(
    backend: Arc<dyn QueueBackend>,
    config: LiveTailConfig,
    queue_url: String,
    sink: mpsc::Sender<TailEvent>,
    token: CancellationToken,
) {
    let mut state = SubscriptionState::new(queue_url.clone());
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(queue_url = %queue_url, "Live-tail subscription started");

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = backend
            .receive_messages(&queue_url, config.max_messages, config.wait_seconds)
            .await;

        // A poll that finishes after cancellation is discarded.
        if token.is_cancelled() {
            break;
        }

        let raw = match result {
            Ok(raw) => raw,
            Err(error) if error.is_transient() => {
                debug!(queue_url = %queue_url, error = %error, "Live-tail poll failed, retrying next tick");
                continue;
            }
            Err(error) => {
                warn!(queue_url = %queue_url, error = %error, "Live-tail poll failed");
                continue;
            }
        };

        let Some(event) = state.absorb(normalize_messages(raw)) else {
            continue;
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = sink.send(event) => {
                if sent.is_err() {
                    debug!(queue_url = %queue_url, "Session closed, stopping live-tail subscription");
                    break;
                }
            }
        }
    }

    debug!(
        queue_url = %queue_url,
        delivered = state.delivered_count(),
        "Live-tail subscription stopped"
    );
}

//! Session table for live tail.

use super::subscription::run_subscription;
use super::{LiveTailConfig, TailEvent};
use queue_scope_runtime::QueueBackend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

struct SessionEntry {
    /// Parent of every subscription token in this session
    token: CancellationToken,
    sink: mpsc::Sender<TailEvent>,
    subscriptions: HashMap<String, CancellationToken>,
}

/// Owns every live-tail session and its subscriptions.
///
/// The session table lock is held only while the table is mutated, never
/// across a backend call or a push.
pub struct LiveTailManager {
    backend: Arc<dyn QueueBackend>,
    config: LiveTailConfig,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl LiveTailManager {
    pub fn new(backend: Arc<dyn QueueBackend>, config: LiveTailConfig) -> Self {
        Self {
            backend,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a session whose events are delivered to `sink`.
    ///
    /// The session ends when the returned handle is closed or dropped.
    pub fn open_session(self: &Arc<Self>, sink: mpsc::Sender<TailEvent>) -> SessionHandle {
        let id = Uuid::new_v4();
        self.sessions().insert(
            id,
            SessionEntry {
                token: CancellationToken::new(),
                sink,
                subscriptions: HashMap::new(),
            },
        );

        info!(session_id = %id, "Live-tail session opened");
        SessionHandle {
            id,
            manager: Arc::clone(self),
        }
    }

    /// Start tailing `queue_url` for a session.
    ///
    /// An existing subscription to the same queue is cancelled and replaced,
    /// which restarts dedup for that queue. Returns `false` if the session
    /// is unknown.
    pub fn subscribe(&self, session_id: Uuid, queue_url: &str) -> bool {
        let mut sessions = self.sessions();
        let Some(session) = sessions.get_mut(&session_id) else {
            return false;
        };

        let token = session.token.child_token();
        if let Some(previous) = session
            .subscriptions
            .insert(queue_url.to_string(), token.clone())
        {
            previous.cancel();
            debug!(session_id = %session_id, queue_url = %queue_url, "Replaced live-tail subscription");
        }

        tokio::spawn(run_subscription(
            Arc::clone(&self.backend),
            self.config.clone(),
            queue_url.to_string(),
            session.sink.clone(),
            token,
        ));

        info!(session_id = %session_id, queue_url = %queue_url, "Subscribed to queue");
        true
    }

    /// Stop tailing `queue_url`. Returns `false` if there was no such
    /// subscription.
    pub fn unsubscribe(&self, session_id: Uuid, queue_url: &str) -> bool {
        let removed = self
            .sessions()
            .get_mut(&session_id)
            .and_then(|session| session.subscriptions.remove(queue_url));

        match removed {
            Some(token) => {
                token.cancel();
                info!(session_id = %session_id, queue_url = %queue_url, "Unsubscribed from queue");
                true
            }
            None => false,
        }
    }

    /// End a session and cancel all its subscriptions.
    pub fn close_session(&self, session_id: Uuid) {
        let removed = self.sessions().remove(&session_id);
        if let Some(session) = removed {
            session.token.cancel();
            info!(
                session_id = %session_id,
                subscriptions = session.subscriptions.len(),
                "Live-tail session closed"
            );
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Number of active subscriptions for a session; 0 if unknown.
    pub fn subscription_count(&self, session_id: Uuid) -> usize {
        self.sessions()
            .get(&session_id)
            .map_or(0, |session| session.subscriptions.len())
    }

    // Table updates are single inserts/removes, so a poisoned lock still
    // guards a consistent map.
    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A registered live-tail session.
///
/// Dropping the handle closes the session.
pub struct SessionHandle {
    id: Uuid,
    manager: Arc<LiveTailManager>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subscribe(&self, queue_url: &str) -> bool {
        self.manager.subscribe(self.id, queue_url)
    }

    pub fn unsubscribe(&self, queue_url: &str) -> bool {
        self.manager.unsubscribe(self.id, queue_url)
    }

    pub fn subscription_count(&self) -> usize {
        self.manager.subscription_count(self.id)
    }

    /// Close the session now rather than on drop.
    pub fn close(self) {}
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.manager.close_session(self.id);
    }
}

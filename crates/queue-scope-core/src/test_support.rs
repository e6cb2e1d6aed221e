//! Backend double shared by the unit tests of this crate.

use async_trait::async_trait;
use queue_scope_runtime::{BackendError, DemoBackend, QueueBackend, ReceivedMessage};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) type ReceiveScript = Result<Vec<ReceivedMessage>, BackendError>;

/// Wraps a [`DemoBackend`] and injects failures or scripted receives.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    pub inner: DemoBackend,
    pub failing_attributes: Mutex<HashSet<String>>,
    pub failing_tags: Mutex<HashSet<String>>,
    pub fail_send: Mutex<bool>,
    pub fail_delete: Mutex<bool>,
    pub fail_receive: Mutex<bool>,
    pub receive_script: Mutex<HashMap<String, VecDeque<ReceiveScript>>>,
    pub receive_calls: AtomicUsize,
}

pub(crate) fn network_error() -> BackendError {
    BackendError::Network {
        message: "connection reset".to_string(),
    }
}

pub(crate) fn raw_message(id: &str, sent_timestamp: i64) -> ReceivedMessage {
    let mut attributes = HashMap::new();
    attributes.insert("SentTimestamp".to_string(), sent_timestamp.to_string());
    attributes.insert("ApproximateReceiveCount".to_string(), "1".to_string());
    ReceivedMessage {
        message_id: Some(id.to_string()),
        body: Some(format!("body of {id}")),
        receipt_handle: Some(format!("rh-{id}")),
        attributes,
        message_attributes: HashMap::new(),
    }
}

impl ScriptedBackend {
    pub fn new(inner: DemoBackend) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_attributes_for(&self, queue_url: &str) {
        self.failing_attributes
            .lock()
            .unwrap()
            .insert(queue_url.to_string());
    }

    pub fn fail_tags_for(&self, queue_url: &str) {
        self.failing_tags.lock().unwrap().insert(queue_url.to_string());
    }

    /// Queue up receive results for a queue; once exhausted, receives fall
    /// through to the demo backend.
    pub fn script_receives(&self, queue_url: &str, results: Vec<ReceiveScript>) {
        self.receive_script
            .lock()
            .unwrap()
            .entry(queue_url.to_string())
            .or_default()
            .extend(results);
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueBackend for ScriptedBackend {
    async fn list_queues(&self, max_results: u32) -> Result<Vec<String>, BackendError> {
        self.inner.list_queues(max_results).await
    }

    async fn get_queue_attributes(
        &self,
        queue_url: &str,
    ) -> Result<HashMap<String, String>, BackendError> {
        if self.failing_attributes.lock().unwrap().contains(queue_url) {
            return Err(network_error());
        }
        self.inner.get_queue_attributes(queue_url).await
    }

    async fn list_queue_tags(
        &self,
        queue_url: &str,
    ) -> Result<HashMap<String, String>, BackendError> {
        if self.failing_tags.lock().unwrap().contains(queue_url) {
            return Err(BackendError::PermissionDenied {
                message: "sqs:ListQueueTags".to_string(),
            });
        }
        self.inner.list_queue_tags(queue_url).await
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_count: u32,
        wait_seconds: u32,
    ) -> Result<Vec<ReceivedMessage>, BackendError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_receive.lock().unwrap() {
            return Err(network_error());
        }
        let scripted = self
            .receive_script
            .lock()
            .unwrap()
            .get_mut(queue_url)
            .and_then(|script| script.pop_front());
        match scripted {
            Some(result) => result,
            None => {
                self.inner
                    .receive_messages(queue_url, max_count, wait_seconds)
                    .await
            }
        }
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> Result<String, BackendError> {
        if *self.fail_send.lock().unwrap() {
            return Err(BackendError::Throttled {
                message: "slow down".to_string(),
            });
        }
        self.inner.send_message(queue_url, body).await
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), BackendError> {
        if *self.fail_delete.lock().unwrap() {
            return Err(network_error());
        }
        self.inner.delete_message(queue_url, receipt_handle).await
    }
}

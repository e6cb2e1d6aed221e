//! Common test utilities for queue-scope-api integration tests
//!
//! This module provides:
//! - A real server on an ephemeral port backed by the demo backend
//! - URL builders for queue resources
//! - A small live-tail WebSocket client

use futures::{SinkExt, StreamExt};
use queue_scope_api::{config::ServiceConfig, serve, AppState, ServiceError};
use queue_scope_runtime::{BackendContext, DemoBackend};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub const ORDERS: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/orders-queue";
pub const DLQ: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/deadletter-queue";

/// Poll interval used by live-tail tests
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// Test Server
// ============================================================================

/// A running server and the demo backend behind it
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    #[allow(dead_code)]
    pub backend: DemoBackend,
    pub client: reqwest::Client,
    handle: JoinHandle<Result<(), ServiceError>>,
}

#[allow(dead_code)]
impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(fast_config()).await
    }

    pub async fn start_with(config: ServiceConfig) -> Self {
        let backend = DemoBackend::new();
        let state = AppState::new(config, Arc::new(backend.clone()), BackendContext::demo());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral port should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        let handle = tokio::spawn(serve(listener, state.clone()));

        Self {
            addr,
            state,
            backend,
            client: reqwest::Client::new(),
            handle,
        }
    }

    /// URL of a resource under `/api/queues/{queueUrl}/`
    pub fn queue_url(&self, queue: &str, resource: &str) -> String {
        format!(
            "http://{}/api/queues/{}/{}",
            self.addr,
            urlencoding::encode(queue),
            resource
        )
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_json(&self, url: &str) -> Value {
        let response = self.client.get(url).send().await.expect("request should succeed");
        assert!(response.status().is_success(), "GET {url}: {}", response.status());
        response.json().await.expect("response should be JSON")
    }

    pub async fn messages(&self, queue: &str) -> Vec<Value> {
        let json = self.get_json(&self.queue_url(queue, "messages?limit=10")).await;
        json.as_array().cloned().unwrap_or_default()
    }

    /// Send a message the way another console user would
    pub async fn send_message(&self, queue: &str, body: &str) -> String {
        let json: Value = self
            .client
            .post(self.queue_url(queue, "messages"))
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .expect("send should succeed")
            .json()
            .await
            .expect("send response should be JSON");
        json["messageId"]
            .as_str()
            .expect("send response should carry a messageId")
            .to_string()
    }

    pub async fn live_tail(&self) -> LiveTailClient {
        let (stream, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("WebSocket upgrade should succeed");
        LiveTailClient { stream }
    }

    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.state.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("server should stop after shutdown")
            .expect("server task should not panic")
    }
}

/// Configuration with intervals short enough for tests
pub fn fast_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.server.shutdown_timeout_seconds = 2;
    config.live_tail.poll_interval_ms = POLL_INTERVAL.as_millis() as u64;
    config.live_tail.ping_interval_seconds = 1;
    config.live_tail.inactivity_timeout_seconds = 3;
    config
}

pub fn ids(messages: &[Value]) -> Vec<String> {
    let mut ids: Vec<String> = messages
        .iter()
        .map(|m| m["messageId"].as_str().unwrap_or_default().to_string())
        .collect();
    ids.sort();
    ids
}

// ============================================================================
// Live-Tail Client
// ============================================================================

/// Thin JSON client over the live-tail WebSocket
pub struct LiveTailClient {
    pub stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[allow(dead_code)]
impl LiveTailClient {
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text.to_string()))
            .await
            .expect("frame should be sent");
    }

    pub async fn subscribe(&mut self, queue: &str) {
        self.send_raw(&serde_json::json!({ "type": "subscribe", "queueUrl": queue }).to_string())
            .await;
    }

    pub async fn unsubscribe(&mut self, queue: &str) {
        self.send_raw(&serde_json::json!({ "type": "unsubscribe", "queueUrl": queue }).to_string())
            .await;
    }

    /// Next JSON event, skipping control frames; `None` on timeout or close.
    pub async fn next_event_within(&mut self, period: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + period;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .ok()??;
            match frame.ok()? {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("event should be JSON"))
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    pub async fn next_event(&mut self) -> Value {
        self.next_event_within(POLL_INTERVAL * 10)
            .await
            .expect("an event should arrive")
    }

    /// Read until the server ends the connection. Returns whether it ended
    /// within `period`.
    pub async fn closed_within(&mut self, period: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + period;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }
}

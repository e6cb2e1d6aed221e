//! WebSocket transport for live tail.
//!
//! One connection is one live-tail session. The connection task is the only
//! writer to the socket: events from every subscription arrive through the
//! session's channel and are written here, interleaved with heartbeat pings.

use crate::errors::ProtocolError;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::{Sink, SinkExt, StreamExt};
use queue_scope_core::{SessionHandle, TailEvent};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "live_tail_ws_tests.rs"]
mod tests;

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        #[serde(rename = "queueUrl")]
        queue_url: String,
    },
    Unsubscribe {
        #[serde(rename = "queueUrl")]
        queue_url: String,
    },
}

impl ClientFrame {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let frame: Self = serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
            message: e.to_string(),
        })?;

        match &frame {
            Self::Subscribe { queue_url } | Self::Unsubscribe { queue_url }
                if queue_url.trim().is_empty() =>
            {
                Err(ProtocolError::Malformed {
                    message: "queueUrl must not be empty".to_string(),
                })
            }
            _ => Ok(frame),
        }
    }
}

/// Keep-alive settings for one connection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Heartbeat {
    pub ping_interval: Duration,
    pub inactivity_timeout: Duration,
}

/// GET /ws - live-tail WebSocket upgrade
pub async fn live_tail_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let settings = &state.config.live_tail;
    let heartbeat = Heartbeat {
        ping_interval: settings.ping_interval(),
        inactivity_timeout: settings.inactivity_timeout(),
    };

    let (events_tx, events_rx) = mpsc::channel(settings.channel_capacity.max(1));
    let session = state.live_tail.open_session(events_tx);
    info!(session_id = %session.id(), "Live-tail connection opened");

    run_connection(socket, &session, events_rx, heartbeat, &state).await;

    info!(
        session_id = %session.id(),
        subscriptions = session.subscription_count(),
        "Live-tail connection closed"
    );
    session.close();
}

enum Inbound {
    Continue,
    Closed,
}

async fn run_connection(
    socket: WebSocket,
    session: &SessionHandle,
    mut events: mpsc::Receiver<TailEvent>,
    heartbeat: Heartbeat,
    state: &AppState,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut ping = tokio::time::interval_at(
        Instant::now() + heartbeat.ping_interval,
        heartbeat.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = tokio::time::sleep(heartbeat.inactivity_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                debug!(session_id = %session.id(), "Server shutting down, closing live-tail connection");
                write_frame(&mut sender, WsMessage::Close(None), heartbeat.inactivity_timeout)
                    .await;
                break;
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(error) => {
                        warn!(session_id = %session.id(), error = %error, "Failed to encode live-tail event");
                        continue;
                    }
                };
                let frame = WsMessage::Text(payload.into());
                if !write_frame(&mut sender, frame, heartbeat.inactivity_timeout).await {
                    debug!(session_id = %session.id(), "Client went away while pushing");
                    break;
                }
            }

            frame = receiver.next() => {
                match frame {
                    Some(Ok(frame)) => {
                        deadline.as_mut().reset(Instant::now() + heartbeat.inactivity_timeout);
                        if let Inbound::Closed = handle_frame(frame, session) {
                            break;
                        }
                    }
                    Some(Err(error)) => {
                        debug!(session_id = %session.id(), error = %error, "WebSocket read failed");
                        break;
                    }
                    None => break,
                }
            }

            _ = ping.tick() => {
                let frame = WsMessage::Ping(Bytes::new());
                if !write_frame(&mut sender, frame, heartbeat.inactivity_timeout).await {
                    debug!(session_id = %session.id(), "Client stopped accepting pings");
                    break;
                }
            }

            _ = &mut deadline => {
                warn!(
                    session_id = %session.id(),
                    timeout_seconds = heartbeat.inactivity_timeout.as_secs(),
                    "Live-tail client inactive, closing connection"
                );
                break;
            }
        }
    }
}

/// Write one frame, giving up after `limit`.
///
/// A client that stops reading eventually blocks the write; that counts as a
/// disconnect, the same as a failed write. Returns whether the frame was sent.
async fn write_frame<S>(sender: &mut S, frame: WsMessage, limit: Duration) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    match tokio::time::timeout(limit, sender.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(_)) => false,
        Err(_) => {
            warn!(
                timeout_seconds = limit.as_secs(),
                "Live-tail client stopped reading, closing connection"
            );
            false
        }
    }
}

fn handle_frame(frame: WsMessage, session: &SessionHandle) -> Inbound {
    let text = match frame {
        WsMessage::Text(text) => text,
        WsMessage::Close(_) => return Inbound::Closed,
        WsMessage::Ping(_) | WsMessage::Pong(_) => return Inbound::Continue,
        WsMessage::Binary(_) => {
            let error = ProtocolError::Unsupported { kind: "binary" };
            warn!(session_id = %session.id(), error = %error, "Dropped live-tail frame");
            return Inbound::Continue;
        }
    };

    match ClientFrame::parse(text.as_str()) {
        Ok(ClientFrame::Subscribe { queue_url }) => {
            session.subscribe(&queue_url);
        }
        Ok(ClientFrame::Unsubscribe { queue_url }) => {
            if !session.unsubscribe(&queue_url) {
                debug!(session_id = %session.id(), queue_url = %queue_url, "Unsubscribe for a queue that was not tailed");
            }
        }
        Err(error) => {
            warn!(session_id = %session.id(), error = %error, "Dropped live-tail frame");
        }
    }

    Inbound::Continue
}

//! WebSocket connection with state tracking and capped reconnect.

use std::sync::Arc;
use std::time::Duration;

use dazzler_shared::ClientMessage;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::{DazzlerError, Result};

/// Connection state for the page socket
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed { reason: String },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        )
    }
}

/// Fixed-interval reconnect with a hard cap.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Reconnect attempts allowed after a close; the counter resets on open.
    pub max_attempts: u32,
    /// Delay before each attempt.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Handle for queueing outbound frames.
///
/// Frames queued while disconnected are flushed after the next open.
#[derive(Clone)]
pub struct WsHandle {
    sender: UnboundedSender<ClientMessage>,
}

impl WsHandle {
    /// A handle plus the receiving end a connection drains.
    pub fn channel() -> (Self, UnboundedReceiver<ClientMessage>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    /// Queue a frame for the server
    pub fn send(&self, message: ClientMessage) -> Result<()> {
        crate::log_debug!("WsHandle::send: {:?}", message);
        self.sender
            .unbounded_send(message)
            .map_err(|e| DazzlerError::Connection(format!("Failed to send: {}", e)))
    }
}

/// Callback invoked with each text frame, in arrival order.
pub type FrameHandler = Arc<dyn Fn(String) + Send + Sync>;

/// A managed WebSocket connection to the page endpoint.
pub struct WsConnection {
    pub url: String,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl WsConnection {
    /// Start connecting in a background task.
    pub fn open(
        url: String,
        reconnect: ReconnectConfig,
        outbound: UnboundedReceiver<ClientMessage>,
        on_frame: FrameHandler,
    ) -> Self {
        let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
        let task = tokio::spawn(connection_loop(
            url.clone(),
            state_tx,
            outbound,
            on_frame,
            reconnect,
        ));
        Self { url, state, task }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait for the first successful open.
    ///
    /// Fails once the reconnect cap is exhausted.
    pub async fn wait_connected(&self) -> Result<()> {
        let mut state = self.state.clone();
        loop {
            match &*state.borrow_and_update() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Failed { reason } => {
                    return Err(DazzlerError::Connection(reason.clone()))
                }
                _ => {}
            }
            if state.changed().await.is_err() {
                return Err(DazzlerError::Connection(format!(
                    "Connection task for {} stopped",
                    self.url
                )));
            }
        }
    }

    /// Stop the connection task.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn connection_loop(
    url: String,
    state: watch::Sender<ConnectionState>,
    outbound: UnboundedReceiver<ClientMessage>,
    on_frame: FrameHandler,
    reconnect: ReconnectConfig,
) {
    let mut outbound = outbound;
    let mut pending: Option<ClientMessage> = None;
    let mut attempt = 0u32;

    loop {
        if attempt == 0 {
            state.send_replace(ConnectionState::Connecting);
        } else {
            state.send_replace(ConnectionState::Reconnecting { attempt });
        }

        match connect_async(url.as_str()).await {
            Ok((ws_stream, _response)) => {
                state.send_replace(ConnectionState::Connected);
                attempt = 0;
                crate::log_info!("WebSocket connected to {}", url);

                let (mut write, mut read) = ws_stream.split();

                let reader = async {
                    while let Some(msg_result) = read.next().await {
                        match msg_result {
                            Ok(Message::Text(text)) => on_frame(text.as_str().to_string()),
                            Ok(Message::Close(_)) => {
                                crate::log_info!("WebSocket to {} received close frame", url);
                                break;
                            }
                            Ok(_) => {
                                // Ping/pong is handled by tungstenite; binary is not part of the protocol.
                            }
                            Err(e) => {
                                crate::log_error!("WebSocket read error: {}", e);
                                break;
                            }
                        }
                    }
                };

                let writer = write_frames(&mut write, &mut outbound, &mut pending);

                // Whichever half stops first ends this connection.
                tokio::select! {
                    _ = reader => {}
                    _ = writer => {}
                }
                crate::log_info!("WebSocket to {} closed", url);
                state.send_replace(ConnectionState::Disconnected);
            }
            Err(e) => {
                crate::log_error!("WebSocket error for {}: {}", url, e);
            }
        }

        if attempt >= reconnect.max_attempts {
            crate::log_warn!(
                "Giving up on {} after {} reconnect attempts",
                url,
                reconnect.max_attempts
            );
            state.send_replace(ConnectionState::Failed {
                reason: format!(
                    "Max reconnect attempts ({}) exceeded",
                    reconnect.max_attempts
                ),
            });
            break;
        }

        attempt += 1;
        crate::log_info!(
            "Reconnecting to {} in {}ms (attempt {})",
            url,
            reconnect.delay.as_millis(),
            attempt
        );
        tokio::time::sleep(reconnect.delay).await;
    }
}

/// Send queued frames until the sink fails or the queue closes.
///
/// The frame being sent stays in `pending` until the sink accepts it, so a
/// connection that drops mid-send resends it after the next open.
async fn write_frames<S>(
    write: &mut S,
    outbound: &mut UnboundedReceiver<ClientMessage>,
    pending: &mut Option<ClientMessage>,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    loop {
        let frame = match pending.take() {
            Some(frame) => frame,
            None => match outbound.next().await {
                Some(frame) => frame,
                None => break,
            },
        };
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                crate::log_error!("Serialize failed: {}", e);
                continue;
            }
        };

        *pending = Some(frame);
        if let Err(e) = write.send(Message::Text(json.into())).await {
            crate::log_error!("Send failed: {}", e);
            break;
        }
        *pending = None;
    }
}

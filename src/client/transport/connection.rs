//! # STOMP Connection
//!
//! One WebSocket session per [`StompConnection`]. Connection state is a
//! single-writer `watch` cell; inbound frames fan out on a `broadcast`
//! channel, so every live receiver sees every frame and late receivers see
//! only what arrives after they subscribed.
//!
//! The read loop runs as one background task per connection. A new connect
//! aborts the previous listener before opening the next socket. A read error
//! leaves the state at `Error`, a clean close at `Disconnected`; the
//! connection never reconnects by itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::frame::{StompCommand, StompFrame};
use super::{ConnectionState, Connector, SocketReader, SocketWriter};
use crate::client::config::{ws_endpoint, Config};
use crate::shared::error::{ChatError, NetworkError, Result, ShootError};

const FRAME_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct Inner {
    writer: Option<Box<dyn SocketWriter>>,
    listener: Option<JoinHandle<()>>,
    /// destination -> subscription id
    subscriptions: HashMap<String, String>,
    next_subscription: u64,
}

/// STOMP-over-WebSocket connection
pub struct StompConnection {
    connector: Arc<dyn Connector>,
    ws_url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    state: Arc<watch::Sender<ConnectionState>>,
    /// bumped whenever a socket is replaced or torn down
    generation: Arc<AtomicU64>,
    frames: broadcast::Sender<StompFrame>,
    inner: Mutex<Inner>,
}

impl StompConnection {
    pub fn new(
        connector: Arc<dyn Connector>,
        ws_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (frames, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        Self {
            connector,
            ws_url: ws_url.into(),
            connect_timeout,
            request_timeout,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            frames,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn from_config(config: &Config, connector: Arc<dyn Connector>) -> Self {
        let app = config.app();
        Self::new(connector, app.ws_url.clone(), app.connect_timeout, app.request_timeout)
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Observe state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Receive every inbound frame from now on
    pub fn frames(&self) -> broadcast::Receiver<StompFrame> {
        self.frames.subscribe()
    }

    /// Open the socket; a no-op while already connected
    pub async fn connect(&self, token: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if self.is_connected() {
            tracing::debug!("[TRANSPORT] Already connected");
            return Ok(());
        }

        self.replace_state(ConnectionState::Connecting);
        if let Some(listener) = inner.listener.take() {
            listener.abort();
        }
        inner.writer = None;
        inner.subscriptions.clear();

        let url = ws_endpoint(&self.ws_url, token)?;
        tracing::info!("[TRANSPORT] Connecting to {}/ws", self.ws_url);

        let pair = match timeout(self.connect_timeout, self.connector.connect(&url)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(self.fail_connect(e)),
            Err(_) => return Err(self.fail_connect(NetworkError::Timeout.into())),
        };

        let mut writer = pair.writer;
        let handshake = StompFrame::connect(host_of(&self.ws_url)).encode();
        match timeout(self.request_timeout, writer.send_text(handshake)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.fail_connect(e)),
            Err(_) => return Err(self.fail_connect(NetworkError::Timeout.into())),
        }

        let generation = self.replace_state(ConnectionState::Connected);
        inner.writer = Some(writer);
        inner.listener = Some(tokio::spawn(run_listener(
            pair.reader,
            self.frames.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.generation),
            generation,
        )));

        tracing::info!("[TRANSPORT] Connected");
        Ok(())
    }

    /// Subscribe to `destination`, returning its `sub-N` id
    pub async fn subscribe(&self, destination: &str) -> Result<String> {
        let mut inner = self.inner.lock().await;
        if let Some(id) = inner.subscriptions.get(destination) {
            if self.is_connected() {
                return Ok(id.clone());
            }
        }

        let id = format!("sub-{}", inner.next_subscription);
        self.write_frame(&mut inner, StompFrame::subscribe(&id, destination)).await?;
        inner.next_subscription += 1;
        inner.subscriptions.insert(destination.to_string(), id.clone());
        tracing::info!("[TRANSPORT] Subscribed to {} as {}", destination, id);
        Ok(id)
    }

    /// Drop the subscription for `destination`, if any
    pub async fn unsubscribe(&self, destination: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let Some(id) = inner.subscriptions.remove(destination) else {
            return Ok(());
        };
        if !self.is_connected() {
            return Ok(());
        }
        self.write_frame(&mut inner, StompFrame::unsubscribe(&id)).await?;
        tracing::info!("[TRANSPORT] Unsubscribed from {}", destination);
        Ok(())
    }

    /// Subscription ids by destination
    pub async fn subscriptions(&self) -> HashMap<String, String> {
        self.inner.lock().await.subscriptions.clone()
    }

    /// Publish a JSON `body` to `destination`
    pub async fn send_to_destination(&self, destination: &str, body: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.write_frame(&mut inner, StompFrame::send(destination, body)).await
    }

    /// Best-effort DISCONNECT and close; always ends `Disconnected`
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        self.replace_state(ConnectionState::Disconnected);
        if let Some(listener) = inner.listener.take() {
            listener.abort();
        }
        inner.subscriptions.clear();

        if let Some(mut writer) = inner.writer.take() {
            let goodbye = StompFrame::disconnect().encode();
            let close = async {
                writer.send_text(goodbye).await?;
                writer.close().await
            };
            match timeout(self.request_timeout, close).await {
                Ok(Ok(())) => tracing::info!("[TRANSPORT] Disconnected"),
                Ok(Err(e)) => tracing::debug!("[TRANSPORT] Close failed: {}", e),
                Err(_) => tracing::debug!("[TRANSPORT] Close timed out"),
            }
        }
    }

    async fn write_frame(&self, inner: &mut Inner, frame: StompFrame) -> Result<()> {
        if !self.is_connected() {
            return Err(ChatError::NotConnected.into());
        }
        let writer = inner.writer.as_mut().ok_or(ChatError::NotConnected)?;

        let result = match timeout(self.request_timeout, writer.send_text(frame.encode())).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout.into()),
        };
        if let Err(e) = &result {
            tracing::warn!("[TRANSPORT] Failed to write {}: {}", frame, e);
            self.replace_state(ConnectionState::Error(e.to_string()));
        }
        result
    }

    fn fail_connect(&self, error: ShootError) -> ShootError {
        tracing::error!("[TRANSPORT] Connection failed: {}", error);
        self.replace_state(ConnectionState::Error(error.to_string()));
        error
    }

    /// Set the state and start a new generation, returning it
    fn replace_state(&self, next: ConnectionState) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = next;
        });
        generation
    }
}

impl Drop for StompConnection {
    fn drop(&mut self) {
        if let Some(listener) = self.inner.get_mut().listener.take() {
            listener.abort();
        }
    }
}

async fn run_listener(
    mut reader: Box<dyn SocketReader>,
    frames: broadcast::Sender<StompFrame>,
    state: Arc<watch::Sender<ConnectionState>>,
    current_generation: Arc<AtomicU64>,
    generation: u64,
) {
    let outcome = loop {
        match reader.next_text().await {
            Some(Ok(text)) => match StompFrame::decode_all(&text) {
                Ok(decoded) => {
                    for frame in decoded {
                        if frame.command == StompCommand::Error {
                            tracing::warn!(
                                "[TRANSPORT] Server error frame: {}",
                                frame.header("message").unwrap_or(&frame.body)
                            );
                        }
                        // no receivers is fine
                        let _ = frames.send(frame);
                    }
                }
                Err(e) => tracing::warn!("[TRANSPORT] Dropping malformed payload: {}", e),
            },
            Some(Err(e)) => {
                tracing::error!("[TRANSPORT] Read failed: {}", e);
                break ConnectionState::Error(e.to_string());
            }
            None => {
                tracing::info!("[TRANSPORT] Socket closed by peer");
                break ConnectionState::Disconnected;
            }
        }
    };

    // a newer connect or disconnect owns the state now
    state.send_if_modified(|current| {
        if current_generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *current = outcome;
        true
    });
}

fn host_of(ws_url: &str) -> &str {
    let without_scheme = ws_url.split_once("://").map(|(_, rest)| rest).unwrap_or(ws_url);
    without_scheme.split(|c| c == '/' || c == '?').next().unwrap_or(without_scheme)
}

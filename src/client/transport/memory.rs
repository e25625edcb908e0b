//! In-memory sockets
//!
//! [`MemoryConnector`] hands out channel-backed sockets and exposes the far
//! end of each one as a [`MemoryPeer`], which plays the server.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::frame::{StompCommand, StompFrame};
use super::{Connector, SocketPair, SocketReader, SocketWriter};
use crate::shared::error::{ChatError, NetworkError, Result, ShootError};

/// Connector producing in-memory sockets
pub struct MemoryConnector {
    offline: AtomicBool,
    opened: AtomicUsize,
    accepted_tx: mpsc::UnboundedSender<MemoryPeer>,
    accepted_rx: Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
}

impl MemoryConnector {
    pub fn new() -> Arc<Self> {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            offline: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            accepted_tx,
            accepted_rx: Mutex::new(accepted_rx),
        })
    }

    /// While offline every connect fails with `NoConnection`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Sockets opened so far
    pub fn connections_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Server end of the next opened socket
    pub async fn accept(&self) -> Option<MemoryPeer> {
        self.accepted_rx.lock().await.recv().await
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<SocketPair> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::NoConnection.into());
        }

        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        self.opened.fetch_add(1, Ordering::SeqCst);

        let peer = MemoryPeer {
            url: url.to_string(),
            incoming: client_rx,
            outgoing: server_tx,
        };
        self.accepted_tx
            .send(peer)
            .map_err(|_| ChatError::ConnectionFailed("connector dropped".into()))?;

        Ok(SocketPair {
            writer: Box::new(MemoryWriter { tx: Some(client_tx) }),
            reader: Box::new(MemoryReader { rx: server_rx }),
        })
    }
}

/// Far end of an in-memory socket
pub struct MemoryPeer {
    /// URL the client connected to
    pub url: String,
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<Result<String>>,
}

impl MemoryPeer {
    /// Next frame written by the client
    pub async fn recv_frame(&mut self) -> Option<StompFrame> {
        let text = self.incoming.recv().await?;
        StompFrame::decode(&text).ok()
    }

    /// Next client frame with `command`, skipping others
    pub async fn recv_command(&mut self, command: StompCommand) -> Option<StompFrame> {
        loop {
            let frame = self.recv_frame().await?;
            if frame.command == command {
                return Some(frame);
            }
        }
    }

    /// Client frames already written, without waiting
    pub fn drain_frames(&mut self) -> Vec<StompFrame> {
        let mut frames = Vec::new();
        while let Ok(text) = self.incoming.try_recv() {
            if let Ok(frame) = StompFrame::decode(&text) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Deliver a frame to the client
    pub fn push_frame(&self, frame: StompFrame) -> bool {
        self.push_text(frame.encode())
    }

    /// Deliver a raw text payload to the client
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.outgoing.send(Ok(text.into())).is_ok()
    }

    /// Make the client's next read fail
    pub fn fail(&self, reason: &str) {
        let _ = self
            .outgoing
            .send(Err(ChatError::ConnectionFailed(reason.to_string()).into()));
    }

    /// Make every further client write fail
    pub fn break_writes(&mut self) {
        self.incoming.close();
    }

    /// Close the socket cleanly
    pub fn close(self) {}
}

struct MemoryWriter {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl SocketWriter for MemoryWriter {
    async fn send_text(&mut self, text: String) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(ChatError::NotConnected)?;
        tx.send(text)
            .map_err(|_| ShootError::from(ChatError::ConnectionFailed("socket closed".into())))
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}

struct MemoryReader {
    rx: mpsc::UnboundedReceiver<Result<String>>,
}

#[async_trait]
impl SocketReader for MemoryReader {
    async fn next_text(&mut self) -> Option<Result<String>> {
        self.rx.recv().await
    }
}

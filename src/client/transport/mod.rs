//! # Realtime Transport
//!
//! WebSocket session carrying STOMP frames between the client and the chat
//! backend.
//!
//! ## Key Components
//!
//! - `frame.rs`: STOMP frame codec
//! - `connection.rs`: [`connection::StompConnection`], one socket per instance
//! - [`Connector`]: opens the raw socket; [`TungsteniteConnector`] in
//!   production, [`memory::MemoryConnector`] in tests

pub mod connection;
pub mod frame;
pub mod memory;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::shared::error::Result;

pub use connection::StompConnection;
pub use frame::{FrameError, StompCommand, StompFrame};
pub use memory::{MemoryConnector, MemoryPeer};

/// State of one transport
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Write half of an open socket
#[async_trait]
pub trait SocketWriter: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
}

/// Read half of an open socket
#[async_trait]
pub trait SocketReader: Send {
    /// Next text payload; `None` once the peer closed the socket
    async fn next_text(&mut self) -> Option<Result<String>>;
}

/// Both halves of an open socket
pub struct SocketPair {
    pub writer: Box<dyn SocketWriter>,
    pub reader: Box<dyn SocketReader>,
}

/// Opens sockets
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<SocketPair>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector backed by `tokio-tungstenite`
#[derive(Debug, Default, Clone)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<SocketPair> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = stream.split();
        Ok(SocketPair {
            writer: Box::new(TungsteniteWriter { sink: write }),
            reader: Box::new(TungsteniteReader { stream: read }),
        })
    }
}

struct TungsteniteWriter {
    sink: SplitSink<WsStream, WsMessage>,
}

#[async_trait]
impl SocketWriter for TungsteniteWriter {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink.send(WsMessage::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.send(WsMessage::Close(None)).await?;
        self.sink.close().await?;
        Ok(())
    }
}

struct TungsteniteReader {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl SocketReader for TungsteniteReader {
    async fn next_text(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => return Some(Ok(text)),
                Ok(WsMessage::Binary(data)) => {
                    return Some(Ok(String::from_utf8_lossy(&data).into_owned()));
                }
                Ok(WsMessage::Close(_)) => return None,
                // tungstenite answers pings itself
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

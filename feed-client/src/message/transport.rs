use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::message::MessageError;
use shared::message::{ChannelFrame, Packet};

/// Time allowed for the Engine.IO open + Socket.IO connect exchange
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport abstraction for the realtime channel
///
/// `recv` yields named event frames only; protocol housekeeping (heartbeats,
/// acks) is handled inside the transport.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn recv(&self) -> Result<ChannelFrame, MessageError>;
    async fn send(&self, frame: &ChannelFrame) -> Result<(), MessageError>;
    async fn close(&self) -> Result<(), MessageError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket.IO over WebSocket transport
#[derive(Clone)]
pub struct WsTransport {
    reader: Arc<Mutex<SplitStream<WsStream>>>,
    writer: Arc<Mutex<SplitSink<WsStream, Message>>>,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport").finish_non_exhaustive()
    }
}

impl WsTransport {
    /// Connect and complete the Socket.IO handshake on the default namespace
    pub async fn connect(url: &str) -> Result<Self, MessageError> {
        let endpoint = engine_url(url);
        tracing::debug!(endpoint = %endpoint, "Connecting realtime channel");

        let (ws, _) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| MessageError::Connection(e.to_string()))?;
        let (writer, reader) = ws.split();
        let transport = Self {
            reader: Arc::new(Mutex::new(reader)),
            writer: Arc::new(Mutex::new(writer)),
        };

        tokio::time::timeout(HANDSHAKE_TIMEOUT, transport.handshake())
            .await
            .map_err(|_| MessageError::Handshake("timed out".into()))??;

        tracing::info!(url = %url, "Realtime channel connected");
        Ok(transport)
    }

    async fn handshake(&self) -> Result<(), MessageError> {
        // Engine.IO open
        loop {
            match self.read_packet().await? {
                Packet::Open(_) => break,
                Packet::Ping => self.write_packet(&Packet::Pong).await?,
                other => tracing::debug!(?other, "Ignoring packet before open"),
            }
        }

        self.write_packet(&Packet::Connect(None)).await?;

        // Socket.IO connect ack
        loop {
            match self.read_packet().await? {
                Packet::Connect(_) => return Ok(()),
                Packet::ConnectError(reason) => {
                    return Err(MessageError::Handshake(reason.to_string()));
                }
                Packet::Ping => self.write_packet(&Packet::Pong).await?,
                Packet::Close | Packet::Disconnect => return Err(MessageError::Closed),
                other => tracing::debug!(?other, "Ignoring packet before connect"),
            }
        }
    }

    async fn read_packet(&self) -> Result<Packet, MessageError> {
        let mut reader = self.reader.lock().await;
        loop {
            let Some(message) = reader.next().await else {
                return Err(MessageError::Closed);
            };
            match message? {
                Message::Text(text) => return Ok(Packet::decode(text.as_str())?),
                Message::Close(_) => return Err(MessageError::Closed),
                // websocket-level ping/pong is answered by tungstenite
                _ => continue,
            }
        }
    }

    async fn write_packet(&self, packet: &Packet) -> Result<(), MessageError> {
        let text = packet.encode()?;
        let mut writer = self.writer.lock().await;
        writer.send(Message::Text(text.into())).await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&self) -> Result<ChannelFrame, MessageError> {
        loop {
            match self.read_packet().await? {
                Packet::Event(frame) => return Ok(frame),
                Packet::Ping => self.write_packet(&Packet::Pong).await?,
                Packet::Close | Packet::Disconnect => return Err(MessageError::Closed),
                Packet::ConnectError(reason) => {
                    return Err(MessageError::Connection(reason.to_string()));
                }
                other => tracing::trace!(?other, "Skipping packet"),
            }
        }
    }

    async fn send(&self, frame: &ChannelFrame) -> Result<(), MessageError> {
        self.write_packet(&Packet::Event(frame.clone())).await
    }

    async fn close(&self) -> Result<(), MessageError> {
        // best effort: the peer may already be gone
        let _ = self.write_packet(&Packet::Disconnect).await;
        let mut writer = self.writer.lock().await;
        writer.close().await?;
        Ok(())
    }
}

/// Build the Engine.IO websocket endpoint for a base URL.
///
/// A URL that already names the `/socket.io/` path is used unchanged.
pub fn engine_url(base: &str) -> String {
    if base.contains("/socket.io/") {
        return base.to_string();
    }
    format!(
        "{}/socket.io/?EIO=4&transport=websocket",
        base.trim_end_matches('/')
    )
}

/// Memory Transport Implementation (for in-process communication)
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    /// Receiver for frames FROM the server
    rx: Arc<Mutex<broadcast::Receiver<ChannelFrame>>>,
    /// Sender for frames TO the server
    tx: broadcast::Sender<ChannelFrame>,
}

impl MemoryTransport {
    /// Create a new memory transport
    ///
    /// # Arguments
    /// * `server_broadcast_tx` - The server's broadcast sender (to subscribe to pushes)
    /// * `client_to_server_tx` - The channel to send frames TO the server
    pub fn new(
        server_broadcast_tx: &broadcast::Sender<ChannelFrame>,
        client_to_server_tx: &broadcast::Sender<ChannelFrame>,
    ) -> Self {
        Self {
            rx: Arc::new(Mutex::new(server_broadcast_tx.subscribe())),
            tx: client_to_server_tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn recv(&self) -> Result<ChannelFrame, MessageError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(frame) => return Ok(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Memory channel lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(MessageError::Closed),
            }
        }
    }

    async fn send(&self, frame: &ChannelFrame) -> Result<(), MessageError> {
        self.tx
            .send(frame.clone())
            .map_err(|e| MessageError::Connection(format!("Failed to send to server: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), MessageError> {
        Ok(())
    }
}

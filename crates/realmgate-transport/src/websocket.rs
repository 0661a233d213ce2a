//! WebSocket listener and split connection halves over `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, FrameReader, FrameWriter, Transport, TransportError};

/// Process-wide source of connection ids. Ids are never reused, so a stale
/// id held by a late callback can't alias a newer connection.
static CONNECTION_IDS: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

fn io_error<E>(kind: io::ErrorKind, error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(kind, error)
}

/// Listens for clients and upgrades each TCP connection to a WebSocket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Port 0 lets the OS pick a free port; see
    /// [`Transport::local_addr`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "listening for WebSocket clients");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<WebSocketConnection, TransportError> {
        let (stream, peer) = self.listener.accept().await.map_err(TransportError::AcceptFailed)?;
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| TransportError::AcceptFailed(io_error(io::ErrorKind::ConnectionRefused, e)))?;

        let id = ConnectionId::new(CONNECTION_IDS.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(connection = %id, %peer, "WebSocket upgrade complete");
        Ok(WebSocketConnection { id, peer, ws })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// An upgraded client connection. Split it with
/// [`into_split`](Self::into_split) before use.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    ws: WsStream,
}

impl WebSocketConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn into_split(self) -> (WebSocketReader, WebSocketWriter) {
        let (sink, stream) = self.ws.split();
        (
            WebSocketReader { id: self.id, stream },
            WebSocketWriter { id: self.id, sink },
        )
    }
}

pub struct WebSocketReader {
    id: ConnectionId,
    stream: SplitStream<WsStream>,
}

impl WebSocketReader {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl FrameReader for WebSocketReader {
    /// Text and binary frames both come back as bytes; control frames are
    /// skipped.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        while let Some(message) = self.stream.next().await {
            let message = message
                .map_err(|e| TransportError::ReceiveFailed(io_error(io::ErrorKind::ConnectionReset, e)))?;
            match message {
                Message::Binary(bytes) => return Ok(Some(bytes.to_vec())),
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}

pub struct WebSocketWriter {
    id: ConnectionId,
    sink: SplitSink<WsStream, Message>,
}

impl WebSocketWriter {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    async fn push(&mut self, message: Message) -> Result<(), TransportError> {
        self.sink
            .send(message)
            .await
            .map_err(|e| TransportError::SendFailed(io_error(io::ErrorKind::BrokenPipe, e)))
    }
}

impl FrameWriter for WebSocketWriter {
    /// Replies always go out as binary frames.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.push(Message::Binary(data.to_vec().into())).await
    }

    async fn close(&mut self, reason: &str) -> Result<(), TransportError> {
        tracing::debug!(connection = %self.id, reason, "closing connection");
        self.push(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_owned().into(),
        })))
        .await
    }
}

//! Connection layer for Realmgate server roles.
//!
//! A server role accepts connections through a [`Transport`] and splits
//! each one into a [`FrameReader`] and a [`FrameWriter`]. The reader half
//! stays with the task that decodes requests; the writer half goes to the
//! task that pushes replies, so a reply (or a timeout disconnect) can be
//! delivered while the reader is parked waiting for the next frame.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketReader, WebSocketTransport, WebSocketWriter,
};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
///
/// Sessions and pending reconnect claims are keyed by this handle, never
/// by a reference to the connection object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of client connections for a server role.
pub trait Transport: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// The next client, once it has completed any protocol handshake.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// The receiving half of a connection.
pub trait FrameReader: Send + 'static {
    /// Receives the next frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// The sending half of a connection.
pub trait FrameWriter: Send + 'static {
    /// Sends one frame.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Closes the connection, telling the peer why.
    async fn close(&mut self, reason: &str) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_orders_by_value() {
        assert!(ConnectionId::new(1) < ConnectionId::new(2));
        assert_eq!(ConnectionId::new(3), ConnectionId::new(3));
    }
}

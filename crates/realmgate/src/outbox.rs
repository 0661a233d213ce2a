//! Replies queued while the handler lock is held.
//!
//! Nothing under the lock touches a socket. The handler and the handoff
//! coordinator push [`Delivery`] values here; the server drains them and
//! routes each to its connection's writer task.

use realmgate_protocol::ServerMessage;
use realmgate_transport::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Send {
        connection: ConnectionId,
        message: ServerMessage,
    },
    /// Close the connection after everything queued before it was sent.
    Disconnect {
        connection: ConnectionId,
        reason: String,
    },
}

impl Delivery {
    pub fn connection(&self) -> ConnectionId {
        match self {
            Self::Send { connection, .. } | Self::Disconnect { connection, .. } => *connection,
        }
    }
}

#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<Delivery>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, connection: ConnectionId, message: ServerMessage) {
        self.deliveries.push(Delivery::Send {
            connection,
            message,
        });
    }

    pub fn disconnect(&mut self, connection: ConnectionId, reason: impl Into<String>) {
        self.deliveries.push(Delivery::Disconnect {
            connection,
            reason: reason.into(),
        });
    }

    /// Takes everything queued so far, in order.
    pub fn take(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.deliveries)
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }
}

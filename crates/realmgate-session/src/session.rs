//! Session types: the record the server keeps for each connection.

use std::fmt;
use std::time::Instant;

use realmgate_protocol::AccountId;
use realmgate_transport::ConnectionId;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The lifecycle status of a session, without the data each state carries.
///
/// Handy for logging and error reporting where the token or account id is
/// noise (or, for tokens, must not be printed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated,
    AwaitingToken,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::AwaitingToken => write!(f, "AwaitingToken"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The state of a session, with the data that belongs to it.
///
/// ```text
///                 login                      match
///  Unauthenticated ─────→ Authenticated ←──────────────┐
///        │    ↑              │                          │
///        │    └───logout─────┘                          │
///        │                                              │
///        └──reconnect(token)──→ AwaitingToken ──────────┘
///                 ↑                  │
///                 └──logout/timeout──┘
/// ```
///
/// Disconnect destroys the session from any state.
///
/// The account is held as an [`AccountId`], not a copy of the record.
/// Storage owns accounts; whoever needs the record looks it up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Fresh connection, or logged out.
    Unauthenticated,

    /// Logged in, either with credentials or through a handoff.
    Authenticated { account: AccountId },

    /// Presented a reconnect token and is waiting for the rendezvous to
    /// match it.
    AwaitingToken { token: String },
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Unauthenticated => SessionStatus::Unauthenticated,
            Self::Authenticated { .. } => SessionStatus::Authenticated,
            Self::AwaitingToken { .. } => SessionStatus::AwaitingToken,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One live connection's session. Created on connect, destroyed on
/// disconnect.
#[derive(Debug, Clone)]
pub struct Session {
    pub connection: ConnectionId,
    pub state: SessionState,
    pub created_at: Instant,
}

impl Session {
    pub fn new(connection: ConnectionId) -> Self {
        Self {
            connection,
            state: SessionState::Unauthenticated,
            created_at: Instant::now(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// The bound account, if authenticated.
    pub fn account(&self) -> Option<AccountId> {
        match self.state {
            SessionState::Authenticated { account } => Some(account),
            _ => None,
        }
    }
}

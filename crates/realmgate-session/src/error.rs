//! Error types for the session layer.

use realmgate_transport::ConnectionId;

use crate::SessionStatus;

/// Errors from [`SessionStateMachine`](crate::SessionStateMachine)
/// operations. None of them changes any state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for this connection (never connected, or already
    /// destroyed).
    #[error("no session for {0}")]
    NotFound(ConnectionId),

    /// `connect` was called twice for the same connection.
    #[error("session for {0} already exists")]
    AlreadyExists(ConnectionId),

    /// The event is not legal in the session's current state, e.g. a login
    /// while already authenticated or waiting on a token.
    #[error("{event} not allowed for {connection} while {from}")]
    InvalidTransition {
        connection: ConnectionId,
        from: SessionStatus,
        event: &'static str,
    },

    /// Logout from a session that never logged in.
    #[error("{0} is not logged in")]
    NotLoggedIn(ConnectionId),
}

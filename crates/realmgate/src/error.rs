//! Unified error type for the account role.

use realmgate_protocol::ProtocolError;
use realmgate_session::SessionError;
use realmgate_transport::TransportError;

use crate::handoff::HandoffError;
use crate::storage::StorageError;

/// Top-level error wrapping every layer's error.
///
/// Client-facing failures never reach this type: the handler turns them
/// into status codes. What ends up here is a server that could not bind,
/// or a connection task that ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum RealmgateError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),
}

//! Wire-level vocabulary for Realmgate server roles.
//!
//! This crate defines what a client and the account role say to each
//! other once a frame has been decoded:
//!
//! - **Types** ([`ClientRequest`], [`ServerMessage`], [`StatusCode`],
//!   [`HandoffTicket`], identifiers): already-decoded operations.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values become
//!   bytes and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about sessions or storage. It sits
//! between the transport (raw frames) and the account handler:
//!
//! ```text
//! Transport (bytes) → Protocol (ClientRequest) → Account handler (sessions)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AccountId, CharacterSummary, ClientRequest, HandoffTicket, MapId,
    Position, ServerAddress, ServerMessage, StatusCode, ATTRIBUTE_COUNT,
};

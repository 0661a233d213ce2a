//! Error types for the protocol layer.

/// Errors raised while turning frames into requests and replies into
/// frames.
///
/// A `ProtocolError` is always scoped to one frame on one connection. The
/// account server answers an undecodable frame with
/// [`ServerMessage::Invalid`](crate::ServerMessage::Invalid) and keeps the
/// connection open.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound message failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The inbound bytes are not a well-formed message: malformed JSON,
    /// unknown `type` tag, missing fields, or wrong field types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

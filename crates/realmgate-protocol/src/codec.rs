//! Codec trait and implementations.
//!
//! The account server never looks at raw bytes directly: every inbound
//! frame goes through a [`Codec`] to become a
//! [`ClientRequest`](crate::ClientRequest), and every
//! [`ServerMessage`](crate::ServerMessage) goes through the same codec on
//! the way out. Swapping JSON for a compact binary format later touches
//! only this module.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because the server shares one codec between
/// every connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes a frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do
    /// not describe a `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Readable in logs and browser tooling, which is what matters while the
/// message set is still moving.
///
/// ```rust
/// use realmgate_protocol::{Codec, JsonCodec, ServerMessage, StatusCode};
///
/// let codec = JsonCodec;
/// let reply = ServerMessage::LogoutResponse { status: StatusCode::Ok };
///
/// let bytes = codec.encode(&reply).unwrap();
/// let decoded: ServerMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(reply, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientRequest, ServerMessage, StatusCode};

    #[test]
    fn test_decode_login_request_from_client_json() {
        let frame = br#"{
            "type": "Login",
            "client_version": 3,
            "username": "alice",
            "password": "secret"
        }"#;

        let req: ClientRequest = JsonCodec.decode(frame).unwrap();

        assert_eq!(
            req,
            ClientRequest::Login {
                client_version: 3,
                username: "alice".into(),
                password: "secret".into(),
            }
        );
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<ClientRequest, _> =
            JsonCodec.decode(b"definitely not json");

        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_produces_tagged_json() {
        let bytes = JsonCodec
            .encode(&ServerMessage::LoginResponse {
                status: StatusCode::ServerFull,
            })
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "LoginResponse");
        assert_eq!(json["status"], "ServerFull");
    }
}

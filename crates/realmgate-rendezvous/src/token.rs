//! Token generation.

use rand::Rng;

/// Length of every issued token, in characters.
pub const TOKEN_LENGTH: usize = 32;

/// Generates a random 32-character lowercase hex token (128 bits).
///
/// Drawn from the thread-local CSPRNG, so tokens are unpredictable and
/// collisions between outstanding tokens are practically impossible.
/// Callers that must rule them out entirely can check
/// [`TokenRendezvous::contains`](crate::TokenRendezvous::contains) and
/// draw again.
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_LENGTH / 2] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The loggable prefix of a token.
///
/// Full tokens are bearer credentials and never go to the logs.
pub fn redact(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

//! Protocol types exchanged between clients and the account role.
//!
//! Everything here is an already-decoded operation: the codec has turned
//! the frame into one of these values, and the account handler consumes
//! them without ever seeing bytes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of base attributes every character carries (strength, agility,
/// dexterity, vitality, intelligence, willpower).
pub const ATTRIBUTE_COUNT: usize = 6;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Storage-assigned identifier of an account.
///
/// Sessions hold this instead of the account record itself: storage owns
/// the record, and anyone who needs it looks it up again by id. A stale id
/// simply resolves to nothing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

/// Identifier of a map. Game servers are assigned whole maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct MapId(pub u16);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map-{}", self.0)
    }
}

/// A tile position on a map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Where a client should open its next connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// StatusCode
// ---------------------------------------------------------------------------

/// Outcome code carried by every `*Response` message.
///
/// One enum for the whole account role. Each response uses the subset
/// that applies to it; the client maps codes to user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// The request succeeded.
    Ok,
    /// Generic failure: wrong session state, wrong old password, no game
    /// server for the selected character's map.
    Failure,
    /// The request needs a logged-in session.
    NoLogin,
    /// Malformed or out-of-range input, or credentials that don't match.
    InvalidArgument,
    /// The client is older than the minimum supported version.
    InvalidVersion,
    /// The server has reached its connection limit.
    ServerFull,
    /// The account exists but is banned.
    Banned,
    /// Registration: the username is taken.
    UsernameTaken,
    /// Registration or email change: the address is already in use.
    EmailTaken,
    /// Character creation: the name is taken server-wide.
    NameTaken,
    /// Character creation: the account already holds the maximum.
    TooManyCharacters,
    InvalidHairStyle,
    InvalidHairColor,
    InvalidGender,
    /// Character creation: attribute points exceed the starting budget.
    AttributesTooHigh,
    /// Character creation: attribute points fall short of the budget.
    AttributesTooLow,
    /// Character creation: an attribute was left at zero.
    AttributeZero,
}

impl StatusCode {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// What the client needs to render one character slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSummary {
    pub slot: u8,
    pub name: String,
    pub gender: u8,
    pub hair_style: u8,
    pub hair_color: u8,
    pub level: u8,
    pub experience: u32,
    pub correction_points: u16,
    pub money: u32,
    pub attributes: [u16; ATTRIBUTE_COUNT],
}

/// Result of a successful character selection.
///
/// The client opens a second connection to `game_server` (and one to
/// `chat_server`) and presents `token` there instead of credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffTicket {
    pub token: String,
    pub game_server: ServerAddress,
    pub chat_server: ServerAddress,
}

// ---------------------------------------------------------------------------
// ClientRequest
// ---------------------------------------------------------------------------

/// A decoded request from a client to the account role.
///
/// Internally tagged, so a login frame reads
/// `{"type": "Login", "client_version": 3, "username": "...", "password": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    Login {
        client_version: u32,
        username: String,
        password: String,
    },

    Logout,

    /// Resume an account session with a token handed out by another role.
    Reconnect { token: String },

    Register {
        client_version: u32,
        username: String,
        password: String,
        email: String,
    },

    /// Delete an account. Sent from a logged-out session with the
    /// account's credentials.
    Unregister { username: String, password: String },

    EmailChange { email: String },

    EmailGet,

    PasswordChange {
        old_password: String,
        new_password: String,
    },

    CharacterCreate {
        name: String,
        hair_style: u8,
        hair_color: u8,
        gender: u8,
        attributes: [u16; ATTRIBUTE_COUNT],
    },

    CharacterSelect { slot: u8 },

    CharacterDelete { slot: u8 },
}

impl ClientRequest {
    /// Short name for logging. Never includes credentials.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Login",
            Self::Logout => "Logout",
            Self::Reconnect { .. } => "Reconnect",
            Self::Register { .. } => "Register",
            Self::Unregister { .. } => "Unregister",
            Self::EmailChange { .. } => "EmailChange",
            Self::EmailGet => "EmailGet",
            Self::PasswordChange { .. } => "PasswordChange",
            Self::CharacterCreate { .. } => "CharacterCreate",
            Self::CharacterSelect { .. } => "CharacterSelect",
            Self::CharacterDelete { .. } => "CharacterDelete",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage
// ---------------------------------------------------------------------------

/// A message from the account role to a client.
///
/// Login, logout, and a successful reconnect each produce exactly one
/// `*Response`. Character lists follow as separate [`CharacterInfo`]
/// messages, one per slot.
///
/// [`CharacterInfo`]: ServerMessage::CharacterInfo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    LoginResponse { status: StatusCode },
    LogoutResponse { status: StatusCode },
    ReconnectResponse { status: StatusCode },
    RegisterResponse { status: StatusCode },
    UnregisterResponse { status: StatusCode },
    EmailChangeResponse { status: StatusCode },
    EmailGetResponse {
        status: StatusCode,
        email: Option<String>,
    },
    PasswordChangeResponse { status: StatusCode },
    CharacterCreateResponse { status: StatusCode },
    CharacterSelectResponse {
        status: StatusCode,
        ticket: Option<HandoffTicket>,
    },
    CharacterDeleteResponse { status: StatusCode },

    /// One character slot of the logged-in account.
    CharacterInfo { character: CharacterSummary },

    /// Sent right before the server closes a connection whose reconnect
    /// token was never matched.
    ConnectionTimedOut,

    /// The last frame could not be decoded.
    Invalid,
}

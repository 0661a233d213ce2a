//! Account and character records.
//!
//! Storage owns these. Sessions only ever hold an [`AccountId`] and look
//! the record up again when they need it.

use std::time::SystemTime;

use realmgate_protocol::{AccountId, CharacterSummary, MapId, Position, ATTRIBUTE_COUNT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Characters one account may hold.
pub const MAX_CHARACTERS: usize = 5;

/// Hex-encoded SHA-256 of `input`. Passwords and email addresses are only
/// ever stored and compared in this form.
pub fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessLevel {
    Banned,
    Restricted,
    #[default]
    Normal,
    GameMaster,
    Admin,
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub gender: u8,
    pub hair_style: u8,
    pub hair_color: u8,
    pub level: u8,
    pub experience: u32,
    /// Unspent points for raising attributes.
    pub correction_points: u16,
    pub money: u32,
    pub attributes: [u16; ATTRIBUTE_COUNT],
    pub map: MapId,
    pub position: Position,
}

impl Character {
    /// What the client sees for this character in `slot`.
    pub fn summary(&self, slot: u8) -> CharacterSummary {
        CharacterSummary {
            slot,
            name: self.name.clone(),
            gender: self.gender,
            hair_style: self.hair_style,
            hair_color: self.hair_color,
            level: self.level,
            experience: self.experience,
            correction_points: self.correction_points,
            money: self.money,
            attributes: self.attributes,
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Assigned by storage when the account is added.
    pub id: AccountId,
    pub name: String,
    password_digest: String,
    email_digest: String,
    pub level: AccessLevel,
    /// Slot `n` is `characters[n]`.
    pub characters: Vec<Character>,
    pub registered_at: SystemTime,
    pub last_login: Option<SystemTime>,
}

impl Account {
    /// A new `Normal` account registered now. The id is a placeholder
    /// until storage assigns one.
    pub fn new(name: impl Into<String>, password: &str, email: &str) -> Self {
        Self {
            id: AccountId(0),
            name: name.into(),
            password_digest: digest(password),
            email_digest: digest(email),
            level: AccessLevel::Normal,
            characters: Vec::new(),
            registered_at: SystemTime::now(),
            last_login: None,
        }
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.password_digest == digest(password)
    }

    pub fn set_password(&mut self, password: &str) {
        self.password_digest = digest(password);
    }

    pub fn email_digest(&self) -> &str {
        &self.email_digest
    }

    pub fn set_email(&mut self, email: &str) {
        self.email_digest = digest(email);
    }

    pub fn is_banned(&self) -> bool {
        self.level == AccessLevel::Banned
    }

    /// One summary per slot, in slot order.
    pub fn character_summaries(&self) -> Vec<CharacterSummary> {
        self.characters
            .iter()
            .enumerate()
            .map(|(slot, c)| c.summary(slot as u8))
            .collect()
    }
}

//! Announcing issued handoffs to the game and chat roles.
//!
//! When a client picks a character, the account server hands it a token
//! and tells the other roles to expect it. The game server learns which
//! character is coming; the chat server learns the name and privileges to
//! attach to the token. How the announcement travels (an inter-server
//! link, a message bus) is up to the [`PeerAnnouncer`] implementation.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use realmgate_protocol::MapId;

use crate::account::{AccessLevel, Character};

/// Outbound side of a handoff.
///
/// Called synchronously under the handler lock, right after the token is
/// registered locally. Implementations must not block; queue the work and
/// return.
pub trait PeerAnnouncer: fmt::Debug + Send + Sync + 'static {
    /// The game server should accept `token` for `character`.
    fn announce_game_client(&self, token: &str, character: &Character);

    /// The chat server should accept `token` for `name` at `level`.
    fn announce_chat_client(&self, token: &str, name: &str, level: AccessLevel);
}

/// Announces nothing. Used when no other roles are connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnnouncer;

impl PeerAnnouncer for NoopAnnouncer {
    fn announce_game_client(&self, _token: &str, _character: &Character) {}

    fn announce_chat_client(&self, _token: &str, _name: &str, _level: AccessLevel) {}
}

/// One announcement as a peer would receive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    Game {
        token: String,
        character: String,
        map: MapId,
    },
    Chat {
        token: String,
        name: String,
        level: AccessLevel,
    },
}

impl Announcement {
    pub fn token(&self) -> &str {
        match self {
            Self::Game { token, .. } | Self::Chat { token, .. } => token,
        }
    }
}

/// Keeps every announcement in memory, in order.
///
/// Share it behind an `Arc` and read it back with
/// [`RecordingAnnouncer::announcements`].
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    log: Mutex<Vec<Announcement>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything announced so far.
    pub fn announcements(&self) -> Vec<Announcement> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, announcement: Announcement) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(announcement);
    }
}

impl PeerAnnouncer for RecordingAnnouncer {
    fn announce_game_client(&self, token: &str, character: &Character) {
        self.record(Announcement::Game {
            token: token.to_owned(),
            character: character.name.clone(),
            map: character.map,
        });
    }

    fn announce_chat_client(&self, token: &str, name: &str, level: AccessLevel) {
        self.record(Announcement::Chat {
            token: token.to_owned(),
            name: name.to_owned(),
            level,
        });
    }
}

#[cfg(test)]
mod tests {
    use realmgate_protocol::{Position, ATTRIBUTE_COUNT};

    use super::*;

    fn character(name: &str) -> Character {
        Character {
            name: name.into(),
            gender: 0,
            hair_style: 0,
            hair_color: 0,
            level: 1,
            experience: 0,
            correction_points: 0,
            money: 0,
            attributes: [10; ATTRIBUTE_COUNT],
            map: MapId(3),
            position: Position::new(0, 0),
        }
    }

    #[test]
    fn test_recording_announcer_keeps_order() {
        let recorder = RecordingAnnouncer::new();

        recorder.announce_game_client("tok", &character("Ayla"));
        recorder.announce_chat_client("tok", "Ayla", AccessLevel::GameMaster);

        assert_eq!(
            recorder.announcements(),
            vec![
                Announcement::Game {
                    token: "tok".into(),
                    character: "Ayla".into(),
                    map: MapId(3),
                },
                Announcement::Chat {
                    token: "tok".into(),
                    name: "Ayla".into(),
                    level: AccessLevel::GameMaster,
                },
            ]
        );
        assert!(recorder.announcements().iter().all(|a| a.token() == "tok"));
    }

    #[test]
    fn test_noop_announcer_accepts_everything() {
        let noop = NoopAnnouncer;
        noop.announce_game_client("tok", &character("Ayla"));
        noop.announce_chat_client("tok", "Ayla", AccessLevel::Normal);
    }
}

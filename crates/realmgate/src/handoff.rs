//! Cross-server handoffs: issuing tokens and redeeming them.
//!
//! A client that picks a character gets a [`HandoffTicket`]: a fresh
//! token plus the game and chat servers to go to next. The token is
//! registered as an expected payload in the session layer's rendezvous,
//! so whichever connection later presents it is bound to the account
//! without sending credentials again.
//!
//! ```text
//!  CharacterSelect ──issue()──→ token T ──→ expect_payload(T, account)
//!                                                     │
//!  Reconnect { T } ──→ AwaitingToken ──── match ──────┘
//!                                            │
//!                                   claim_matched(): reload account,
//!                                   ReconnectResponse(Ok) + characters
//! ```
//!
//! Issued tokens are also announced to the game and chat roles through a
//! [`PeerAnnouncer`]. Peer roles announce their own tokens with
//! [`HandoffCoordinator::expect_reconnect`].

use std::sync::Arc;
use std::time::SystemTime;

use realmgate_protocol::{AccountId, HandoffTicket, MapId, ServerAddress, ServerMessage, StatusCode};
use realmgate_rendezvous::{generate_token, redact, Registration};
use realmgate_session::{HandoffEvents, SessionStateMachine};
use realmgate_transport::ConnectionId;

use crate::outbox::Outbox;
use crate::peer::{NoopAnnouncer, PeerAnnouncer};
use crate::resolver::GameServerResolver;
use crate::storage::Storage;

/// What a redeemed token turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffPayload {
    pub account: AccountId,
    /// Name of the selected character, when the handoff came from a
    /// character selection.
    pub character: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("{0} is not logged in")]
    NotLoggedIn(ConnectionId),

    #[error("account {0} no longer exists")]
    UnknownAccount(AccountId),

    #[error("account {account} has no character in slot {slot}")]
    NoSuchCharacter { account: AccountId, slot: u8 },

    #[error("no game server for {0}")]
    NoServerForMap(MapId),
}

impl HandoffError {
    /// The status a client sees for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotLoggedIn(_) | Self::UnknownAccount(_) => StatusCode::NoLogin,
            Self::NoSuchCharacter { .. } => StatusCode::InvalidArgument,
            Self::NoServerForMap(_) => StatusCode::Failure,
        }
    }
}

// ---------------------------------------------------------------------------
// HandoffCoordinator
// ---------------------------------------------------------------------------

/// Owns storage, the map resolver, and the outbox, and implements
/// [`HandoffEvents`] on top of them.
///
/// Kept apart from the [`SessionStateMachine`] so the two can be borrowed
/// mutably at the same time: the state machine drives the rendezvous, the
/// coordinator answers its callbacks.
#[derive(Debug)]
pub struct HandoffCoordinator<S, R> {
    storage: S,
    resolver: R,
    chat_server: ServerAddress,
    announcer: Arc<dyn PeerAnnouncer>,
    outbox: Outbox,
}

impl<S, R> HandoffCoordinator<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    pub fn new(storage: S, resolver: R, chat_server: ServerAddress) -> Self {
        Self {
            storage,
            resolver,
            chat_server,
            announcer: Arc::new(NoopAnnouncer),
            outbox: Outbox::new(),
        }
    }

    /// Replaces where issued tokens are announced. Defaults to
    /// [`NoopAnnouncer`].
    pub fn set_announcer(&mut self, announcer: Arc<dyn PeerAnnouncer>) {
        self.announcer = announcer;
    }

    /// Issues a handoff ticket for the character in `slot` of the account
    /// logged in on `connection`.
    ///
    /// The token is registered locally first, then announced once to the
    /// game role and once to the chat role. On failure nothing is
    /// registered or announced and the session is left as it was.
    pub fn issue(
        &mut self,
        sessions: &mut SessionStateMachine<HandoffPayload>,
        connection: ConnectionId,
        slot: u8,
    ) -> Result<HandoffTicket, HandoffError> {
        let account_id = sessions
            .account_of(connection)
            .ok_or(HandoffError::NotLoggedIn(connection))?;
        let account = self
            .storage
            .find_account_by_id(account_id)
            .ok_or(HandoffError::UnknownAccount(account_id))?;
        let character = account
            .characters
            .get(usize::from(slot))
            .ok_or(HandoffError::NoSuchCharacter {
                account: account_id,
                slot,
            })?;

        let Some(game_server) = self.resolver.resolve_game_server(character.map) else {
            tracing::error!(
                %connection,
                account = %account_id,
                map = %character.map,
                "character select: no game server for map"
            );
            return Err(HandoffError::NoServerForMap(character.map));
        };

        let token = loop {
            let candidate = generate_token();
            if !sessions.rendezvous().contains(&candidate) {
                break candidate;
            }
        };

        let payload = HandoffPayload {
            account: account_id,
            character: Some(character.name.clone()),
        };
        sessions.expect_payload(&token, payload, self);
        self.announcer.announce_game_client(&token, character);
        self.announcer
            .announce_chat_client(&token, &character.name, account.level);

        tracing::info!(
            %connection,
            account = %account_id,
            character = %character.name,
            token = redact(&token),
            %game_server,
            "handoff issued"
        );

        Ok(HandoffTicket {
            token,
            game_server,
            chat_server: self.chat_server.clone(),
        })
    }

    /// Registers a token announced by a peer role: whoever reconnects here
    /// with `token` is `account`.
    pub fn expect_reconnect(
        &mut self,
        sessions: &mut SessionStateMachine<HandoffPayload>,
        token: &str,
        account: AccountId,
    ) -> Registration {
        tracing::debug!(%account, token = redact(token), "peer announced reconnect");
        let payload = HandoffPayload {
            account,
            character: None,
        };
        sessions.expect_payload(token, payload, self)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }
}

impl<S, R> HandoffEvents<HandoffPayload> for HandoffCoordinator<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    fn claim_matched(
        &mut self,
        connection: ConnectionId,
        token: &str,
        payload: HandoffPayload,
    ) -> Option<AccountId> {
        let status = match self.storage.find_account_by_id(payload.account) {
            None => {
                tracing::warn!(
                    %connection,
                    account = %payload.account,
                    character = payload.character.as_deref(),
                    token = redact(token),
                    "handoff for an account that no longer exists"
                );
                StatusCode::Failure
            }
            Some(account) if account.is_banned() => {
                tracing::info!(%connection, account = %account.id, "handoff refused, account banned");
                StatusCode::Banned
            }
            Some(mut account) => {
                tracing::info!(
                    %connection,
                    account = %account.id,
                    character = payload.character.as_deref(),
                    "handoff redeemed"
                );
                account.last_login = Some(SystemTime::now());
                if let Err(e) = self.storage.persist(&account) {
                    tracing::error!(account = %account.id, error = %e, "failed to stamp last login");
                }
                self.outbox.send(
                    connection,
                    ServerMessage::ReconnectResponse {
                        status: StatusCode::Ok,
                    },
                );
                for character in account.character_summaries() {
                    self.outbox
                        .send(connection, ServerMessage::CharacterInfo { character });
                }
                return Some(account.id);
            }
        };

        self.outbox
            .send(connection, ServerMessage::ReconnectResponse { status });
        None
    }

    fn claim_timed_out(&mut self, connection: ConnectionId, token: &str) {
        tracing::info!(%connection, token = redact(token), "reconnect token expired");
        self.outbox.send(connection, ServerMessage::ConnectionTimedOut);
        self.outbox
            .disconnect(connection, "reconnect token timed out");
    }

    fn payload_expired(&mut self, token: &str, payload: HandoffPayload) {
        tracing::info!(
            account = %payload.account,
            character = payload.character.as_deref(),
            token = redact(token),
            "handoff token expired unclaimed"
        );
    }
}

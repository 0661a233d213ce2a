//! Request dispatch for the account role.
//!
//! [`AccountHandler`] is the synchronous core of the server: it takes a
//! decoded [`ClientRequest`] for one connection, updates sessions and
//! storage, and queues replies in the outbox. It never awaits and never
//! touches a socket, so the server can run every call under one lock and
//! tests can drive it directly.
//!
//! Every request gets exactly one `*Response`, except `Reconnect`, which
//! is answered only once the token resolves.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use realmgate_protocol::{
    AccountId, ClientRequest, ServerMessage, StatusCode, ATTRIBUTE_COUNT,
};
use realmgate_rendezvous::{redact, Registration, RendezvousConfig};
use realmgate_session::{ReconnectOutcome, SessionError, SessionStateMachine, SessionStatus};
use realmgate_transport::ConnectionId;

use crate::account::{Account, Character, MAX_CHARACTERS};
use crate::config::AccountConfig;
use crate::handoff::{HandoffCoordinator, HandoffPayload};
use crate::outbox::Delivery;
use crate::peer::PeerAnnouncer;
use crate::resolver::GameServerResolver;
use crate::storage::Storage;
use crate::validate;

pub struct AccountHandler<S, R> {
    sessions: SessionStateMachine<HandoffPayload>,
    coordinator: HandoffCoordinator<S, R>,
    config: AccountConfig,
}

impl<S, R> AccountHandler<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    pub fn new(config: AccountConfig, rendezvous: RendezvousConfig, storage: S, resolver: R) -> Self {
        let coordinator = HandoffCoordinator::new(storage, resolver, config.chat_server.clone());
        Self {
            sessions: SessionStateMachine::new(rendezvous),
            coordinator,
            config,
        }
    }

    /// Announces issued tokens to the game and chat roles through
    /// `announcer`.
    pub fn with_announcer(mut self, announcer: Arc<dyn PeerAnnouncer>) -> Self {
        self.coordinator.set_announcer(announcer);
        self
    }

    // -- Connection lifecycle -----------------------------------------------

    pub fn connect(&mut self, connection: ConnectionId) -> Result<(), SessionError> {
        self.sessions.connect(connection)?;
        Ok(())
    }

    pub fn disconnect(&mut self, connection: ConnectionId) {
        if let Some(session) = self.sessions.disconnect(connection) {
            tracing::info!(
                %connection,
                status = %session.status(),
                "client disconnected"
            );
        }
    }

    /// Evicts stale reconnect claims and unclaimed tokens.
    pub fn sweep(&mut self, now: Instant) -> usize {
        self.sessions.sweep(now, &mut self.coordinator)
    }

    /// A peer role announces that `token` belongs to `account`.
    pub fn expect_reconnect(&mut self, token: &str, account: AccountId) -> Registration {
        self.coordinator
            .expect_reconnect(&mut self.sessions, token, account)
    }

    /// Everything queued since the last call.
    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        self.coordinator.outbox_mut().take()
    }

    // -- Dispatch -----------------------------------------------------------

    /// Answers a frame that did not decode.
    pub fn handle_invalid(&mut self, connection: ConnectionId) {
        self.reply(connection, ServerMessage::Invalid);
    }

    pub fn handle(&mut self, connection: ConnectionId, request: ClientRequest) {
        tracing::debug!(%connection, kind = request.kind(), "request");
        match request {
            ClientRequest::Login {
                client_version,
                username,
                password,
            } => self.handle_login(connection, client_version, &username, &password),
            ClientRequest::Logout => self.handle_logout(connection),
            ClientRequest::Reconnect { token } => self.handle_reconnect(connection, &token),
            ClientRequest::Register {
                client_version,
                username,
                password,
                email,
            } => self.handle_register(connection, client_version, &username, &password, &email),
            ClientRequest::Unregister { username, password } => {
                self.handle_unregister(connection, &username, &password)
            }
            ClientRequest::EmailChange { email } => self.handle_email_change(connection, &email),
            ClientRequest::EmailGet => self.handle_email_get(connection),
            ClientRequest::PasswordChange {
                old_password,
                new_password,
            } => self.handle_password_change(connection, &old_password, &new_password),
            ClientRequest::CharacterCreate {
                name,
                hair_style,
                hair_color,
                gender,
                attributes,
            } => self.handle_character_create(
                connection, &name, hair_style, hair_color, gender, &attributes,
            ),
            ClientRequest::CharacterSelect { slot } => self.handle_character_select(connection, slot),
            ClientRequest::CharacterDelete { slot } => self.handle_character_delete(connection, slot),
        }
    }

    // -- Accessors ----------------------------------------------------------

    pub fn sessions(&self) -> &SessionStateMachine<HandoffPayload> {
        &self.sessions
    }

    pub fn storage(&self) -> &S {
        self.coordinator.storage()
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.coordinator.storage_mut()
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        self.coordinator.resolver_mut()
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Unauthenticated requests
    // -----------------------------------------------------------------------

    fn handle_login(
        &mut self,
        connection: ConnectionId,
        client_version: u32,
        username: &str,
        password: &str,
    ) {
        let status = self.login(connection, client_version, username, password);
        self.reply(connection, ServerMessage::LoginResponse { status });
        if status.is_ok() {
            self.send_characters(connection);
        }
    }

    fn login(
        &mut self,
        connection: ConnectionId,
        client_version: u32,
        username: &str,
        password: &str,
    ) -> StatusCode {
        if !self.is_unauthenticated(connection) {
            return StatusCode::Failure;
        }
        if client_version < self.config.min_client_version {
            return StatusCode::InvalidVersion;
        }
        if validate::has_double_quotes(username) {
            return StatusCode::InvalidArgument;
        }
        if self.sessions.authenticated_count() >= self.config.max_clients {
            tracing::warn!(%connection, max = self.config.max_clients, "login refused, server full");
            return StatusCode::ServerFull;
        }
        let Some(mut account) = self.storage().verify_credentials(username, password) else {
            tracing::info!(%connection, "login failed, bad credentials");
            return StatusCode::InvalidArgument;
        };
        if account.is_banned() {
            tracing::info!(%connection, account = %account.id, "login refused, account banned");
            return StatusCode::Banned;
        }
        if let Err(e) = self.sessions.login(connection, account.id) {
            tracing::warn!(%connection, error = %e, "login transition rejected");
            return StatusCode::Failure;
        }

        account.last_login = Some(SystemTime::now());
        if let Err(e) = self.storage_mut().persist(&account) {
            tracing::error!(account = %account.id, error = %e, "failed to stamp last login");
        }
        StatusCode::Ok
    }

    fn handle_logout(&mut self, connection: ConnectionId) {
        let status = match self.sessions.logout(connection) {
            Ok(_) => StatusCode::Ok,
            Err(SessionError::NotLoggedIn(_)) => StatusCode::NoLogin,
            Err(e) => {
                tracing::warn!(%connection, error = %e, "logout failed");
                StatusCode::NoLogin
            }
        };
        self.reply(connection, ServerMessage::LogoutResponse { status });
    }

    fn handle_reconnect(&mut self, connection: ConnectionId, token: &str) {
        match self
            .sessions
            .reconnect(connection, token, &mut self.coordinator)
        {
            Ok(ReconnectOutcome::Waiting) => {
                tracing::debug!(%connection, token = redact(token), "reconnect waiting for its token");
            }
            // Matched and rejected claims were answered by the coordinator;
            // ignored ones get no answer at all.
            Ok(_) => {}
            Err(e) => tracing::warn!(%connection, error = %e, "reconnect failed"),
        }
    }

    fn handle_register(
        &mut self,
        connection: ConnectionId,
        client_version: u32,
        username: &str,
        password: &str,
        email: &str,
    ) {
        let status = self.register(connection, client_version, username, password, email);
        self.reply(connection, ServerMessage::RegisterResponse { status });
    }

    fn register(
        &mut self,
        connection: ConnectionId,
        client_version: u32,
        username: &str,
        password: &str,
        email: &str,
    ) -> StatusCode {
        if !self.is_unauthenticated(connection) {
            return StatusCode::Failure;
        }
        if client_version < self.config.min_client_version {
            return StatusCode::InvalidVersion;
        }
        if !validate::is_valid_username(username)
            || !validate::is_valid_password(password)
            || !validate::is_valid_email(email)
        {
            return StatusCode::InvalidArgument;
        }
        if self.storage().find_account_by_name(username).is_some() {
            return StatusCode::UsernameTaken;
        }
        if self.storage().email_exists(email) {
            return StatusCode::EmailTaken;
        }

        let id = match self.storage_mut().add_account(Account::new(username, password, email)) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(%connection, error = %e, "failed to store new account");
                return StatusCode::Failure;
            }
        };
        tracing::info!(%connection, account = %id, "account registered");

        if let Err(e) = self.sessions.login(connection, id) {
            tracing::warn!(%connection, error = %e, "could not log in new account");
        }
        StatusCode::Ok
    }

    fn handle_unregister(&mut self, connection: ConnectionId, username: &str, password: &str) {
        let status = self.unregister(connection, username, password);
        self.reply(connection, ServerMessage::UnregisterResponse { status });
    }

    fn unregister(&mut self, connection: ConnectionId, username: &str, password: &str) -> StatusCode {
        if !self.is_unauthenticated(connection) {
            return StatusCode::Failure;
        }
        if validate::has_double_quotes(username) {
            return StatusCode::InvalidArgument;
        }
        let Some(account) = self.storage().verify_credentials(username, password) else {
            return StatusCode::InvalidArgument;
        };
        match self.storage_mut().delete_account(account.id) {
            Ok(_) => {
                tracing::info!(%connection, account = %account.id, "account unregistered");
                StatusCode::Ok
            }
            Err(e) => {
                tracing::error!(%connection, error = %e, "failed to delete account");
                StatusCode::Failure
            }
        }
    }

    // -----------------------------------------------------------------------
    // Authenticated requests
    // -----------------------------------------------------------------------

    fn handle_email_change(&mut self, connection: ConnectionId, email: &str) {
        let status = match self.current_account(connection) {
            None => StatusCode::NoLogin,
            Some(_) if !validate::is_valid_email(email) => StatusCode::InvalidArgument,
            Some(_) if self.storage().email_exists(email) => StatusCode::EmailTaken,
            Some(mut account) => {
                account.set_email(email);
                self.persist_status(&account)
            }
        };
        self.reply(connection, ServerMessage::EmailChangeResponse { status });
    }

    fn handle_email_get(&mut self, connection: ConnectionId) {
        let reply = match self.current_account(connection) {
            None => ServerMessage::EmailGetResponse {
                status: StatusCode::NoLogin,
                email: None,
            },
            Some(account) => ServerMessage::EmailGetResponse {
                status: StatusCode::Ok,
                email: Some(account.email_digest().to_owned()),
            },
        };
        self.reply(connection, reply);
    }

    fn handle_password_change(&mut self, connection: ConnectionId, old: &str, new: &str) {
        let status = match self.current_account(connection) {
            None => StatusCode::NoLogin,
            Some(_) if !validate::is_valid_password(new) => StatusCode::InvalidArgument,
            Some(account) if !account.check_password(old) => StatusCode::Failure,
            Some(mut account) => {
                account.set_password(new);
                self.persist_status(&account)
            }
        };
        self.reply(connection, ServerMessage::PasswordChangeResponse { status });
    }

    fn handle_character_create(
        &mut self,
        connection: ConnectionId,
        name: &str,
        hair_style: u8,
        hair_color: u8,
        gender: u8,
        attributes: &[u16; ATTRIBUTE_COUNT],
    ) {
        match self.create_character(connection, name, hair_style, hair_color, gender, attributes) {
            Ok(slot) => {
                self.reply(
                    connection,
                    ServerMessage::CharacterCreateResponse {
                        status: StatusCode::Ok,
                    },
                );
                if let Some(character) = self
                    .current_account(connection)
                    .and_then(|a| a.characters.get(usize::from(slot)).map(|c| c.summary(slot)))
                {
                    self.reply(connection, ServerMessage::CharacterInfo { character });
                }
            }
            Err(status) => self.reply(connection, ServerMessage::CharacterCreateResponse { status }),
        }
    }

    /// Returns the new character's slot.
    fn create_character(
        &mut self,
        connection: ConnectionId,
        name: &str,
        hair_style: u8,
        hair_color: u8,
        gender: u8,
        attributes: &[u16; ATTRIBUTE_COUNT],
    ) -> Result<u8, StatusCode> {
        let mut account = self.current_account(connection).ok_or(StatusCode::NoLogin)?;
        if validate::has_double_quotes(name) {
            return Err(StatusCode::InvalidArgument);
        }
        validate::check_appearance(hair_style, hair_color, gender)?;
        if !validate::is_valid_character_name(name) {
            return Err(StatusCode::InvalidArgument);
        }
        if self.storage().character_name_exists(name) {
            return Err(StatusCode::NameTaken);
        }
        if account.characters.len() >= MAX_CHARACTERS {
            return Err(StatusCode::TooManyCharacters);
        }
        validate::check_attributes(attributes)?;

        account.characters.push(Character {
            name: name.to_owned(),
            gender,
            hair_style,
            hair_color,
            level: 1,
            experience: 0,
            correction_points: 0,
            money: 0,
            attributes: *attributes,
            map: self.config.default_map,
            position: self.config.start_position,
        });
        let slot = (account.characters.len() - 1) as u8;

        self.storage_mut().persist(&account).map_err(|e| {
            tracing::error!(account = %account.id, error = %e, "failed to store new character");
            StatusCode::Failure
        })?;
        tracing::info!(%connection, account = %account.id, slot, "character created");
        Ok(slot)
    }

    fn handle_character_select(&mut self, connection: ConnectionId, slot: u8) {
        let reply = match self
            .coordinator
            .issue(&mut self.sessions, connection, slot)
        {
            Ok(ticket) => ServerMessage::CharacterSelectResponse {
                status: StatusCode::Ok,
                ticket: Some(ticket),
            },
            Err(e) => {
                tracing::debug!(%connection, slot, error = %e, "character select failed");
                ServerMessage::CharacterSelectResponse {
                    status: e.status(),
                    ticket: None,
                }
            }
        };
        self.reply(connection, reply);
    }

    fn handle_character_delete(&mut self, connection: ConnectionId, slot: u8) {
        let status = match self.current_account(connection) {
            None => StatusCode::NoLogin,
            Some(account) if usize::from(slot) >= account.characters.len() => StatusCode::InvalidArgument,
            Some(mut account) => {
                let removed = account.characters.remove(usize::from(slot));
                tracing::info!(%connection, account = %account.id, character = %removed.name, "character deleted");
                self.persist_status(&account)
            }
        };
        self.reply(connection, ServerMessage::CharacterDeleteResponse { status });
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn reply(&mut self, connection: ConnectionId, message: ServerMessage) {
        self.coordinator.outbox_mut().send(connection, message);
    }

    fn send_characters(&mut self, connection: ConnectionId) {
        let Some(account) = self.current_account(connection) else {
            return;
        };
        for character in account.character_summaries() {
            self.reply(connection, ServerMessage::CharacterInfo { character });
        }
    }

    fn is_unauthenticated(&self, connection: ConnectionId) -> bool {
        self.sessions.status(connection) == Some(SessionStatus::Unauthenticated)
    }

    /// A fresh copy of the account bound to `connection`. `None` if the
    /// session is not authenticated or the account has since been deleted.
    fn current_account(&self, connection: ConnectionId) -> Option<Account> {
        let id = self.sessions.account_of(connection)?;
        self.storage().find_account_by_id(id)
    }

    fn persist_status(&mut self, account: &Account) -> StatusCode {
        match self.storage_mut().persist(account) {
            Ok(()) => StatusCode::Ok,
            Err(e) => {
                tracing::error!(account = %account.id, error = %e, "failed to store account");
                StatusCode::Failure
            }
        }
    }
}

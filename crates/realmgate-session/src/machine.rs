//! The session state machine: legal transitions plus the reconnect
//! rendezvous.

use std::collections::HashMap;
use std::time::Instant;

use realmgate_protocol::AccountId;
use realmgate_rendezvous::{
    redact, Registration, RendezvousConfig, RendezvousHandler, TokenRendezvous,
};
use realmgate_transport::ConnectionId;

use crate::{HandoffEvents, Session, SessionError, SessionState, SessionStatus};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a reconnect request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// The session was not `Unauthenticated`; nothing changed.
    Ignored,
    /// No payload yet. The session is `AwaitingToken`.
    Waiting,
    /// A payload was already expected and the handoff bound this account.
    Matched(AccountId),
    /// A payload was already expected but the events implementation
    /// declined it. The session is back to `Unauthenticated`.
    Rejected,
}

/// What a logout did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// An authenticated session dropped its account.
    LoggedOut(AccountId),
    /// A session waiting on a token withdrew its claim.
    ClaimCancelled,
}

// ---------------------------------------------------------------------------
// SessionStateMachine
// ---------------------------------------------------------------------------

/// Owns every live session and the rendezvous that reconnect claims wait
/// in.
///
/// `P` is the payload an announcing server attaches to a token. The state
/// machine never looks inside it; it is passed through to
/// [`HandoffEvents::claim_matched`] when a claim resolves.
///
/// Not thread-safe on its own. The server wraps it (together with storage)
/// in one lock, so every operation here is atomic with respect to every
/// other.
#[derive(Debug)]
pub struct SessionStateMachine<P> {
    sessions: HashMap<ConnectionId, Session>,
    rendezvous: TokenRendezvous<ConnectionId, P>,
}

impl<P> SessionStateMachine<P> {
    pub fn new(config: RendezvousConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            rendezvous: TokenRendezvous::new(config),
        }
    }

    /// Creates an `Unauthenticated` session for a new connection.
    pub fn connect(&mut self, connection: ConnectionId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&connection) {
            return Err(SessionError::AlreadyExists(connection));
        }
        tracing::debug!(%connection, "session created");
        Ok(self
            .sessions
            .entry(connection)
            .or_insert_with(|| Session::new(connection)))
    }

    /// Binds `account` to an `Unauthenticated` session.
    ///
    /// Credentials are the caller's business; this only enforces the
    /// transition.
    pub fn login(
        &mut self,
        connection: ConnectionId,
        account: AccountId,
    ) -> Result<(), SessionError> {
        let session = self.session_mut(connection)?;
        if session.status() != SessionStatus::Unauthenticated {
            return Err(SessionError::InvalidTransition {
                connection,
                from: session.status(),
                event: "login",
            });
        }
        session.state = SessionState::Authenticated { account };
        tracing::info!(%connection, %account, "session logged in");
        Ok(())
    }

    /// Presents a reconnect token.
    ///
    /// Only an `Unauthenticated` session may reconnect; from any other
    /// state the request is ignored. Otherwise the session moves to
    /// `AwaitingToken` and its claim enters the rendezvous. If the payload
    /// was already announced, the match (and `events.claim_matched`)
    /// happens before this returns. A session already waiting on the same
    /// token is returned to `Unauthenticated` without a reply.
    pub fn reconnect<E>(
        &mut self,
        connection: ConnectionId,
        token: &str,
        events: &mut E,
    ) -> Result<ReconnectOutcome, SessionError>
    where
        E: HandoffEvents<P>,
    {
        let session = self.session_mut(connection)?;
        if session.status() != SessionStatus::Unauthenticated {
            tracing::debug!(
                %connection,
                status = %session.status(),
                "reconnect ignored, session not logged out"
            );
            return Ok(ReconnectOutcome::Ignored);
        }
        session.state = SessionState::AwaitingToken {
            token: token.to_owned(),
        };
        tracing::debug!(%connection, token = redact(token), "session awaiting token");

        // A second claim on the same token replaces the first; the earlier
        // session is released so it can log in or reconnect again.
        if let Some(&replaced) = self.rendezvous.claimant(token) {
            if replaced != connection {
                if let Some(stranded) = self.sessions.get_mut(&replaced) {
                    stranded.state = SessionState::Unauthenticated;
                }
                tracing::warn!(
                    %replaced,
                    %connection,
                    token = redact(token),
                    "reconnect token claimed again, releasing earlier session"
                );
            }
        }

        let mut bridge = Bridge {
            sessions: &mut self.sessions,
            events,
        };
        match self.rendezvous.register_claimant(token, connection, &mut bridge) {
            Registration::Pending => Ok(ReconnectOutcome::Waiting),
            Registration::Matched => Ok(match self.account_of(connection) {
                Some(account) => ReconnectOutcome::Matched(account),
                None => ReconnectOutcome::Rejected,
            }),
        }
    }

    /// Logs a session out.
    ///
    /// From `Authenticated` the account is dropped; from `AwaitingToken`
    /// the pending claim is withdrawn without any callback. Both end in
    /// `Unauthenticated`.
    pub fn logout(&mut self, connection: ConnectionId) -> Result<LogoutOutcome, SessionError> {
        let session = self.session_mut(connection)?;
        let outcome = match session.state {
            SessionState::Unauthenticated => {
                return Err(SessionError::NotLoggedIn(connection));
            }
            SessionState::Authenticated { account } => LogoutOutcome::LoggedOut(account),
            SessionState::AwaitingToken { .. } => LogoutOutcome::ClaimCancelled,
        };
        session.state = SessionState::Unauthenticated;

        if outcome == LogoutOutcome::ClaimCancelled {
            self.rendezvous.cancel_claimant(&connection);
        }
        tracing::info!(%connection, ?outcome, "session logged out");
        Ok(outcome)
    }

    /// Destroys the session of a closed connection.
    ///
    /// A session still waiting on a token has its claim withdrawn first,
    /// so a payload announced later finds no stale claimant. Returns the
    /// removed session, or `None` if there was none.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection)?;
        if session.status() == SessionStatus::AwaitingToken {
            self.rendezvous.cancel_claimant(&connection);
        }
        tracing::debug!(%connection, status = %session.status(), "session destroyed");
        Some(session)
    }

    /// Announces that whoever presents `token` should receive `payload`.
    ///
    /// If a session is already waiting on `token`, the match (and
    /// `events.claim_matched`) happens before this returns.
    pub fn expect_payload<E>(&mut self, token: &str, payload: P, events: &mut E) -> Registration
    where
        E: HandoffEvents<P>,
    {
        let mut bridge = Bridge {
            sessions: &mut self.sessions,
            events,
        };
        self.rendezvous.register_payload(token, payload, &mut bridge)
    }

    /// Evicts rendezvous entries older than the configured timeout.
    ///
    /// Each timed-out session is moved to `Unauthenticated` and then
    /// reported through `events.claim_timed_out`. Returns the number of
    /// evicted entries of both sides.
    pub fn sweep<E>(&mut self, now: Instant, events: &mut E) -> usize
    where
        E: HandoffEvents<P>,
    {
        let mut bridge = Bridge {
            sessions: &mut self.sessions,
            events,
        };
        self.rendezvous.sweep(now, &mut bridge)
    }

    // -- Accessors ----------------------------------------------------------

    pub fn get(&self, connection: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection)
    }

    pub fn status(&self, connection: ConnectionId) -> Option<SessionStatus> {
        self.sessions.get(&connection).map(Session::status)
    }

    /// The account bound to a session, if it is authenticated.
    pub fn account_of(&self, connection: ConnectionId) -> Option<AccountId> {
        self.sessions.get(&connection).and_then(Session::account)
    }

    /// Connections currently authenticated as `account`.
    pub fn connections_for(&self, account: AccountId) -> Vec<ConnectionId> {
        self.sessions
            .values()
            .filter(|s| s.account() == Some(account))
            .map(|s| s.connection)
            .collect()
    }

    pub fn authenticated_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.status() == SessionStatus::Authenticated)
            .count()
    }

    pub fn rendezvous(&self) -> &TokenRendezvous<ConnectionId, P> {
        &self.rendezvous
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session_mut(&mut self, connection: ConnectionId) -> Result<&mut Session, SessionError> {
        self.sessions
            .get_mut(&connection)
            .ok_or(SessionError::NotFound(connection))
    }
}

impl<P> Default for SessionStateMachine<P> {
    fn default() -> Self {
        Self::new(RendezvousConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Turns rendezvous callbacks into session transitions, then forwards them
/// to the caller's [`HandoffEvents`].
///
/// Borrows the sessions map separately from the rendezvous so both can be
/// mutated inside one rendezvous call.
struct Bridge<'a, E> {
    sessions: &'a mut HashMap<ConnectionId, Session>,
    events: &'a mut E,
}

impl<P, E> RendezvousHandler<ConnectionId, P> for Bridge<'_, E>
where
    E: HandoffEvents<P>,
{
    fn matched(&mut self, token: &str, connection: ConnectionId, payload: P) {
        let Some(session) = self.sessions.get_mut(&connection) else {
            tracing::warn!(%connection, token = redact(token), "match for a vanished session");
            return;
        };
        if session.status() != SessionStatus::AwaitingToken {
            tracing::warn!(
                %connection,
                status = %session.status(),
                "match for a session that is not awaiting a token"
            );
            return;
        }

        session.state = match self.events.claim_matched(connection, token, payload) {
            Some(account) => {
                tracing::info!(%connection, %account, "handoff completed");
                SessionState::Authenticated { account }
            }
            None => {
                tracing::info!(%connection, "handoff rejected");
                SessionState::Unauthenticated
            }
        };
    }

    fn claimant_timed_out(&mut self, token: &str, connection: ConnectionId) {
        let Some(session) = self.sessions.get_mut(&connection) else {
            tracing::debug!(%connection, "timeout for a vanished session");
            return;
        };
        if session.status() != SessionStatus::AwaitingToken {
            tracing::debug!(%connection, status = %session.status(), "stale timeout ignored");
            return;
        }
        session.state = SessionState::Unauthenticated;
        self.events.claim_timed_out(connection, token);
    }

    fn payload_timed_out(&mut self, token: &str, payload: P) {
        self.events.payload_expired(token, payload);
    }
}

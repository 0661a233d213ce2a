use realmgate_protocol::AccountId;
use realmgate_transport::ConnectionId;

/// Callbacks the state machine makes when a pending reconnect claim
/// resolves. Implemented by whoever owns storage and the outbound path
/// (the handoff coordinator in a running server).
///
/// Every claim that leaves the rendezvous other than through logout or
/// disconnect produces exactly one of `claim_matched` or
/// `claim_timed_out`.
pub trait HandoffEvents<P> {
    /// The session on `connection` presented `token` and `payload` was
    /// announced for it.
    ///
    /// Return the account to bind. `None` rejects the handoff (the account
    /// vanished or was banned in the meantime) and the session falls back
    /// to `Unauthenticated`. Either way the implementation owes the client
    /// its reconnect reply.
    fn claim_matched(
        &mut self,
        connection: ConnectionId,
        token: &str,
        payload: P,
    ) -> Option<AccountId>;

    /// Nobody vouched for `token` in time. The session is already back to
    /// `Unauthenticated`; the implementation sends the timeout notice and
    /// closes the connection.
    fn claim_timed_out(&mut self, connection: ConnectionId, token: &str);

    /// An announced payload was never claimed.
    fn payload_expired(&mut self, token: &str, payload: P);
}

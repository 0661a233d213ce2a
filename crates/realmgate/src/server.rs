//! `AccountServer` builder, accept loop, and per-connection tasks.
//!
//! ```text
//!   accept ──→ connection task (reader) ──decode──┐
//!                      ▲                          ▼
//!                      │              lock(AccountHandler) ── handle()
//!                      │                          │
//!              writer task ←── route(deliveries) ─┘
//!
//!   tick task ── every 1/sweep_rate_hz ──→ lock(AccountHandler) ── sweep()
//! ```
//!
//! Every handler call goes through [`ServerState::with_handler`], which
//! drains the outbox and hands the deliveries to the writer channels
//! before anything else can take the handler lock. Writers do the actual
//! socket I/O outside the lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use realmgate_protocol::{AccountId, ClientRequest, Codec, JsonCodec};
use realmgate_rendezvous::{Registration, RendezvousConfig};
use realmgate_tick::{TickConfig, TickScheduler};
use realmgate_transport::{
    ConnectionId, FrameReader, FrameWriter, Transport, WebSocketConnection, WebSocketReader,
    WebSocketTransport,
};
use tokio::sync::{mpsc, Mutex};

use crate::config::{AccountConfig, ServerConfig};
use crate::handler::AccountHandler;
use crate::outbox::Delivery;
use crate::peer::PeerAnnouncer;
use crate::resolver::GameServerResolver;
use crate::storage::Storage;
use crate::RealmgateError;

/// What a connection's writer task is asked to do.
#[derive(Debug)]
enum Outbound {
    Frame(Vec<u8>),
    Close(String),
}

type Routes = HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>;

/// State shared by the accept loop, every connection task, and the tick
/// task.
///
/// Lock order is always `handler` then `routes`.
pub(crate) struct ServerState<S, R> {
    handler: Mutex<AccountHandler<S, R>>,
    routes: Mutex<Routes>,
    codec: JsonCodec,
}

impl<S, R> ServerState<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    /// Runs `f` under the handler lock, then routes whatever it queued.
    pub(crate) async fn with_handler<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut AccountHandler<S, R>) -> T + Send,
        T: Send,
    {
        let mut handler = self.handler.lock().await;
        let result = f(&mut *handler);
        let deliveries = handler.take_deliveries();
        let routes = self.routes.lock().await;
        drop(handler);

        for delivery in deliveries {
            self.route(&routes, delivery);
        }
        result
    }

    fn route(&self, routes: &Routes, delivery: Delivery) {
        let connection = delivery.connection();
        let Some(sender) = routes.get(&connection) else {
            tracing::debug!(%connection, "dropping delivery for a closed connection");
            return;
        };
        let outbound = match delivery {
            Delivery::Send { message, .. } => match self.codec.encode(&message) {
                Ok(bytes) => Outbound::Frame(bytes),
                Err(e) => {
                    tracing::error!(%connection, error = %e, "failed to encode reply");
                    return;
                }
            },
            Delivery::Disconnect { reason, .. } => Outbound::Close(reason),
        };
        if sender.send(outbound).is_err() {
            tracing::debug!(%connection, "writer task already gone");
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and starting an account server.
///
/// # Example
///
/// ```rust,no_run
/// use realmgate::prelude::*;
///
/// # async fn start() -> Result<(), RealmgateError> {
/// let server = AccountServerBuilder::new()
///     .bind("0.0.0.0:9601")
///     .build(MemoryStorage::new(), MapTable::new())
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccountServerBuilder {
    config: ServerConfig,
    announcer: Option<Arc<dyn PeerAnnouncer>>,
}

impl AccountServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind to. Port 0 picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_owned();
        self
    }

    pub fn account_config(mut self, config: AccountConfig) -> Self {
        self.config.account = config;
        self
    }

    pub fn rendezvous_config(mut self, config: RendezvousConfig) -> Self {
        self.config.rendezvous = config;
        self
    }

    pub fn sweep_rate_hz(mut self, rate: u32) -> Self {
        self.config.sweep_rate_hz = rate;
        self
    }

    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Where issued handoff tokens are announced. Without one, tokens are
    /// only registered locally.
    pub fn announcer(mut self, announcer: Arc<dyn PeerAnnouncer>) -> Self {
        self.announcer = Some(announcer);
        self
    }

    /// Binds the listener. Nothing is accepted until
    /// [`AccountServer::run`].
    pub async fn build<S, R>(self, storage: S, resolver: R) -> Result<AccountServer<S, R>, RealmgateError>
    where
        S: Storage,
        R: GameServerResolver,
    {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let mut handler = AccountHandler::new(
            self.config.account.clone(),
            self.config.rendezvous.clone(),
            storage,
            resolver,
        );
        if let Some(announcer) = self.announcer {
            handler = handler.with_announcer(announcer);
        }
        let state = Arc::new(ServerState {
            handler: Mutex::new(handler),
            routes: Mutex::new(HashMap::new()),
            codec: JsonCodec,
        });

        Ok(AccountServer {
            transport,
            state,
            config: self.config,
        })
    }
}

// ---------------------------------------------------------------------------
// AccountServer
// ---------------------------------------------------------------------------

pub struct AccountServer<S, R> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, R>>,
    config: ServerConfig,
}

impl<S, R> AccountServer<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle for talking to the running server from outside: peer
    /// announcements, storage administration.
    pub fn handle(&self) -> AccountServerHandle<S, R> {
        AccountServerHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Starts the sweep tick and runs the accept loop. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), RealmgateError> {
        tracing::info!(
            addr = %self.config.bind_addr,
            timeout_ms = self.config.rendezvous.timeout.as_millis() as u64,
            "account server running"
        );

        let tick = TickConfig::with_rate(self.config.sweep_rate_hz);
        tokio::spawn(run_sweeps(Arc::clone(&self.state), tick));

        let request_timeout = self.config.request_timeout;
        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state, request_timeout).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Cloneable handle to a running [`AccountServer`].
pub struct AccountServerHandle<S, R> {
    state: Arc<ServerState<S, R>>,
}

impl<S, R> Clone for AccountServerHandle<S, R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S, R> AccountServerHandle<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    /// A peer role announces that whoever reconnects with `token` is
    /// `account`. If that client is already waiting, it is answered now.
    pub async fn expect_reconnect(&self, token: &str, account: AccountId) -> Registration {
        let token = token.to_owned();
        self.state
            .with_handler(move |h| h.expect_reconnect(&token, account))
            .await
    }

    /// Runs `f` against storage under the handler lock.
    pub async fn with_storage<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut S) -> T + Send,
        T: Send,
    {
        self.state.with_handler(|h| f(h.storage_mut())).await
    }

    /// Runs `f` against the map resolver under the handler lock.
    pub async fn with_resolver<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut R) -> T + Send,
        T: Send,
    {
        self.state.with_handler(|h| f(h.resolver_mut())).await
    }

    pub async fn session_count(&self) -> usize {
        self.state.handler.lock().await.sessions().len()
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn run_sweeps<S, R>(state: Arc<ServerState<S, R>>, tick: TickConfig)
where
    S: Storage,
    R: GameServerResolver,
{
    let mut scheduler = TickScheduler::new(tick);
    loop {
        let tick = scheduler.wait_for_tick().await;
        let evicted = state.with_handler(|h| h.sweep(tick.at)).await;
        if evicted > 0 {
            tracing::debug!(tick = tick.tick, evicted, "sweep");
        }
    }
}

/// Drop guard that destroys the session and the route when the
/// connection task exits, even by panic. `Drop` can't await, so the
/// cleanup runs in its own task.
struct ConnectionGuard<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    connection: ConnectionId,
    state: Arc<ServerState<S, R>>,
}

impl<S, R> Drop for ConnectionGuard<S, R>
where
    S: Storage,
    R: GameServerResolver,
{
    fn drop(&mut self) {
        let connection = self.connection;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.with_handler(|h| h.disconnect(connection)).await;
            state.routes.lock().await.remove(&connection);
        });
    }
}

async fn handle_connection<S, R>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, R>>,
    request_timeout: Option<Duration>,
) -> Result<(), RealmgateError>
where
    S: Storage,
    R: GameServerResolver,
{
    let connection = conn.id();
    tracing::debug!(%connection, peer = %conn.peer_addr(), "handling new connection");
    let (mut reader, mut writer) = conn.into_split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let mut handler = state.handler.lock().await;
        handler.connect(connection)?;
        state.routes.lock().await.insert(connection, tx);
    }
    let _guard = ConnectionGuard {
        connection,
        state: Arc::clone(&state),
    };

    let mut writer_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(bytes) => {
                    if let Err(e) = writer.send(&bytes).await {
                        tracing::debug!(%connection, error = %e, "send failed");
                        break;
                    }
                }
                Outbound::Close(reason) => {
                    let _ = writer.close(&reason).await;
                    break;
                }
            }
        }
    });

    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut writer_task => {
                tracing::debug!(%connection, "writer closed the connection");
                break;
            }
            frame = next_frame(&mut reader, request_timeout) => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        let request = state.codec.decode::<ClientRequest>(&frame);
        state
            .with_handler(move |h| match request {
                Ok(request) => h.handle(connection, request),
                Err(e) => {
                    tracing::debug!(%connection, error = %e, "undecodable frame");
                    h.handle_invalid(connection);
                }
            })
            .await;
    }

    // _guard drops here and destroys the session.
    Ok(())
}

/// The next frame, or `None` once the connection is done (closed, failed,
/// or idle past `request_timeout`).
async fn next_frame(reader: &mut WebSocketReader, request_timeout: Option<Duration>) -> Option<Vec<u8>> {
    let connection = reader.id();
    let received = match request_timeout {
        Some(limit) => match tokio::time::timeout(limit, reader.recv()).await {
            Ok(received) => received,
            Err(_) => {
                tracing::info!(%connection, "connection idle too long");
                return None;
            }
        },
        None => reader.recv().await,
    };
    match received {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            tracing::debug!(%connection, "connection closed cleanly");
            None
        }
        Err(e) => {
            tracing::debug!(%connection, error = %e, "recv error");
            None
        }
    }
}

//! # Realmgate
//!
//! Account server role for multiplayer game backends.
//!
//! Clients log in here, manage their account and characters, and pick a
//! character to play. Picking one hands the client off to a game server
//! with a one-shot token instead of credentials; clients coming back from
//! another role present such a token to resume their account session.
//!
//! ## Layers
//!
//! ```text
//! realmgate-transport   WebSocket listener, split reader/writer halves
//! realmgate-protocol    ClientRequest / ServerMessage / StatusCode, JSON codec
//! realmgate-rendezvous  token ↔ payload matching with timeout eviction
//! realmgate-session     per-connection state machine over the rendezvous
//! realmgate-tick        fixed-rate maintenance tick
//! realmgate (this)      accounts, storage, handoffs, peer announcements,
//!                       request dispatch, server
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use realmgate::prelude::*;
//!
//! # async fn start() -> Result<(), RealmgateError> {
//! let maps = MapTable::new().with_map(MapId(1), ServerAddress::new("game1.local", 9604));
//! let server = AccountServerBuilder::new()
//!     .bind("0.0.0.0:9601")
//!     .build(MemoryStorage::new(), maps)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod account;
pub mod config;
mod error;
pub mod handler;
pub mod handoff;
pub mod outbox;
pub mod peer;
pub mod resolver;
mod server;
pub mod storage;
pub mod validate;

pub use error::RealmgateError;
pub use server::{AccountServer, AccountServerBuilder, AccountServerHandle};

pub mod prelude {
    pub use crate::account::{AccessLevel, Account, Character};
    pub use crate::config::{AccountConfig, ServerConfig};
    pub use crate::handler::AccountHandler;
    pub use crate::handoff::{HandoffCoordinator, HandoffError, HandoffPayload};
    pub use crate::outbox::Delivery;
    pub use crate::peer::{Announcement, NoopAnnouncer, PeerAnnouncer, RecordingAnnouncer};
    pub use crate::resolver::{GameServerResolver, MapTable};
    pub use crate::storage::{MemoryStorage, Storage, StorageError};
    pub use crate::{AccountServer, AccountServerBuilder, AccountServerHandle, RealmgateError};

    pub use realmgate_protocol::{
        AccountId, ClientRequest, HandoffTicket, MapId, Position, ServerAddress, ServerMessage,
        StatusCode,
    };
    pub use realmgate_rendezvous::RendezvousConfig;
    pub use realmgate_transport::ConnectionId;
}

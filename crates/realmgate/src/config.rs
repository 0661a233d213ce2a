//! Configuration for the account role.
//!
//! Every struct has a usable `Default` and derives `Deserialize`, so a
//! deployment can fill them from whatever file format it likes and leave
//! out the fields it doesn't care about.

use std::time::Duration;

use realmgate_protocol::{MapId, Position, ServerAddress};
use realmgate_rendezvous::RendezvousConfig;
use serde::{Deserialize, Serialize};

/// Port the account role listens on unless told otherwise.
pub const DEFAULT_ACCOUNT_PORT: u16 = 9601;

/// Account handler behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Clients reporting an older version are turned away at login and
    /// registration.
    pub min_client_version: u32,

    /// Maximum number of logged-in sessions. Logins beyond it get
    /// `ServerFull`.
    pub max_clients: usize,

    /// Map new characters start on.
    pub default_map: MapId,

    pub start_position: Position,

    /// Handed to clients alongside the game server on character select.
    pub chat_server: ServerAddress,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            min_client_version: 0,
            max_clients: 1000,
            default_map: MapId(1),
            start_position: Position::new(512, 512),
            chat_server: ServerAddress::new("localhost", DEFAULT_ACCOUNT_PORT + 2),
        }
    }
}

/// Everything [`AccountServerBuilder`](crate::AccountServerBuilder) needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub account: AccountConfig,
    pub rendezvous: RendezvousConfig,

    /// How often stale reconnect claims are swept. 0 disables sweeping.
    pub sweep_rate_hz: u32,

    /// A connection that sends nothing for this long is closed. Must be
    /// longer than the rendezvous timeout or waiting clients get cut off
    /// before their own timeout notice.
    pub request_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_ACCOUNT_PORT}"),
            account: AccountConfig::default(),
            rendezvous: RendezvousConfig::default(),
            sweep_rate_hz: 1,
            request_timeout: Some(Duration::from_secs(300)),
        }
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`TokenRendezvous`](crate::TokenRendezvous).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendezvousConfig {
    /// How long a pending entry may wait for its other half before a sweep
    /// evicts it. One value for every token.
    ///
    /// Default: 30 seconds.
    pub timeout: Duration,
}

impl RendezvousConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

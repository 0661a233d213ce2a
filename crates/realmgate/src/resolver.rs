//! Which game server hosts which map.

use std::collections::HashMap;

use realmgate_protocol::{MapId, ServerAddress};
use serde::{Deserialize, Serialize};

/// Finds the game server responsible for a map.
///
/// `None` means no server currently hosts it; character selection then
/// fails without issuing a token.
pub trait GameServerResolver: Send + 'static {
    fn resolve_game_server(&self, map: MapId) -> Option<ServerAddress>;
}

/// A fixed map → server table, with an optional catch-all.
///
/// ```rust
/// use realmgate::resolver::{GameServerResolver, MapTable};
/// use realmgate_protocol::{MapId, ServerAddress};
///
/// let table = MapTable::new().with_map(MapId(1), ServerAddress::new("game1", 9604));
/// assert!(table.resolve_game_server(MapId(1)).is_some());
/// assert!(table.resolve_game_server(MapId(2)).is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapTable {
    maps: HashMap<MapId, ServerAddress>,
    fallback: Option<ServerAddress>,
}

impl MapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(mut self, map: MapId, server: ServerAddress) -> Self {
        self.maps.insert(map, server);
        self
    }

    /// Server used for maps without an explicit entry.
    pub fn with_fallback(mut self, server: ServerAddress) -> Self {
        self.fallback = Some(server);
        self
    }

    /// Assigns `map` to `server`, returning the previous assignment.
    pub fn insert(&mut self, map: MapId, server: ServerAddress) -> Option<ServerAddress> {
        self.maps.insert(map, server)
    }

    pub fn remove(&mut self, map: MapId) -> Option<ServerAddress> {
        self.maps.remove(&map)
    }
}

impl GameServerResolver for MapTable {
    fn resolve_game_server(&self, map: MapId) -> Option<ServerAddress> {
        self.maps.get(&map).or(self.fallback.as_ref()).cloned()
    }
}

//! Simulation host trait

use crate::lifecycle::LifecycleSender;
use simlink_core::{Gamemode, MapInfo, ShuffleMode};

/// The running simulation, as seen by the bridge and the console
///
/// Implement this trait to connect a game engine. Every method is called
/// from threads the engine does not own, so implementations must be cheap
/// and must not block on the engine's own tick.
pub trait SimulationHost: Send + Sync + 'static {
    /// Number of connected players
    fn population(&self) -> usize;

    /// Plain names of connected players
    fn player_names(&self) -> Vec<String>;

    /// Map currently being played
    fn current_map(&self) -> Option<MapInfo>;

    /// Every map the server can rotate to
    fn maps(&self) -> Vec<MapInfo>;

    /// Next map in rotation after `current` for `mode`, `None` if the
    /// rotation keeps the current map
    fn next_map(&self, mode: Gamemode, current: Option<&MapInfo>) -> Option<MapInfo>;

    /// Force the next map, overriding rotation once
    fn set_next_map_override(&self, map: MapInfo);

    fn set_shuffle_mode(&self, mode: ShuffleMode);

    fn is_paused(&self) -> bool;

    fn set_paused(&self, paused: bool);

    /// Send a chat message to every connected player
    fn broadcast(&self, message: &str);

    /// Deliver join, leave, chat and game-over events to `events` from now
    /// on. A later call replaces the earlier subscriber.
    fn subscribe(&self, events: LifecycleSender);

    /// Look a map up by name, ignoring case, color markup and underscores
    fn find_map(&self, name: &str) -> Option<MapInfo> {
        let wanted = name.replace('_', " ");
        self.maps()
            .into_iter()
            .find(|map| map.plain_name().replace('_', " ").eq_ignore_ascii_case(&wanted))
    }
}

//! In-memory simulation host
//!
//! Stands in for a game engine when the control channel runs on its own.
//! It keeps a player list, a wave counter, a map rotation and a pause flag.
//! Joins, leaves, chat and game overs are published to the subscribed
//! lifecycle sender, the same way an engine's callbacks would be.

use crate::host::SimulationHost;
use crate::lifecycle::LifecycleSender;
use simlink_core::{GameSnapshot, Gamemode, LifecycleEvent, MapInfo, ShuffleMode, Team};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Debug)]
struct HeadlessState {
    players: Vec<String>,
    paused: bool,
    wave: u32,
    maps: Vec<MapInfo>,
    current: Option<usize>,
    next_override: Option<MapInfo>,
    shuffle: ShuffleMode,
    broadcasts: Vec<String>,
    events: Option<LifecycleSender>,
}

impl HeadlessState {
    fn publish(&self, event: LifecycleEvent) {
        match &self.events {
            Some(events) => events.send(event),
            None => debug!("No lifecycle subscriber, dropping {:?}", event),
        }
    }
}

/// Headless [`SimulationHost`]
#[derive(Debug)]
pub struct HeadlessHost {
    state: Mutex<HeadlessState>,
}

impl HeadlessHost {
    /// Host with `maps` in rotation, playing the first one at wave 1
    pub fn new(maps: Vec<MapInfo>) -> Self {
        let current = if maps.is_empty() { None } else { Some(0) };
        Self {
            state: Mutex::new(HeadlessState {
                players: Vec::new(),
                paused: false,
                wave: 1,
                maps,
                current,
                next_override: None,
                shuffle: ShuffleMode::All,
                broadcasts: Vec::new(),
                events: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect a player
    pub fn join(&self, name: &str) {
        let mut state = self.lock();
        state.players.push(name.to_string());
        let population = state.players.len();
        state.publish(LifecycleEvent::PlayerJoin {
            player: Some(name.to_string()),
            population,
        });
    }

    /// Disconnect a player. Returns false if nobody by that name is connected.
    pub fn leave(&self, name: &str) -> bool {
        let mut state = self.lock();
        let Some(pos) = state.players.iter().position(|p| p == name) else {
            return false;
        };
        state.players.remove(pos);
        let remaining = state.players.len();
        state.publish(LifecycleEvent::PlayerLeave {
            player: Some(name.to_string()),
            remaining,
        });
        true
    }

    pub fn chat(&self, name: &str, message: &str) {
        self.lock().publish(LifecycleEvent::PlayerChat {
            player: Some(name.to_string()),
            message: message.to_string(),
        });
    }

    /// Advance to the next wave, returning its number
    pub fn run_wave(&self) -> u32 {
        let mut state = self.lock();
        state.wave += 1;
        state.wave
    }

    pub fn wave(&self) -> u32 {
        self.lock().wave
    }

    /// End the current game under the rules of `mode`.
    ///
    /// Survival and sandbox games are wave games; pvp games report the
    /// winning team in pvp form.
    pub fn game_over(&self, winner: Option<Team>, mode: Gamemode) {
        let state = self.lock();
        let snapshot = GameSnapshot {
            waves: matches!(mode, Gamemode::Survival | Gamemode::Sandbox),
            pvp: mode == Gamemode::Pvp,
            wave: state.wave,
            population: state.players.len(),
            map: state.current.map(|i| state.maps[i].clone()),
        };
        state.publish(LifecycleEvent::GameOver { winner, snapshot });
    }

    /// Start a new game on the next map (override first, then rotation).
    /// Returns `None` and replays the current map when rotation yields none.
    pub fn load_next_map(&self, mode: Gamemode) -> Option<MapInfo> {
        let current = self.current_map();
        let next = self.next_map(mode, current.as_ref());

        let mut state = self.lock();
        state.wave = 1;
        let next = next?;
        state.next_override = None;
        state.current = state.maps.iter().position(|m| m.name == next.name);
        info!("Loaded map {}", next.plain_name());
        Some(next)
    }

    /// Messages broadcast so far
    pub fn broadcasts(&self) -> Vec<String> {
        self.lock().broadcasts.clone()
    }

    pub fn shuffle_mode(&self) -> ShuffleMode {
        self.lock().shuffle
    }
}

impl SimulationHost for HeadlessHost {
    fn population(&self) -> usize {
        self.lock().players.len()
    }

    fn player_names(&self) -> Vec<String> {
        self.lock().players.clone()
    }

    fn current_map(&self) -> Option<MapInfo> {
        let state = self.lock();
        state.current.map(|i| state.maps[i].clone())
    }

    fn maps(&self) -> Vec<MapInfo> {
        self.lock().maps.clone()
    }

    fn next_map(&self, _mode: Gamemode, current: Option<&MapInfo>) -> Option<MapInfo> {
        let state = self.lock();
        if let Some(map) = &state.next_override {
            return Some(map.clone());
        }

        let pool: Vec<&MapInfo> = match state.shuffle {
            ShuffleMode::None => return None,
            ShuffleMode::All => state.maps.iter().collect(),
            ShuffleMode::Custom => {
                let custom: Vec<&MapInfo> = state.maps.iter().filter(|m| !m.builtin).collect();
                if custom.is_empty() {
                    state.maps.iter().collect()
                } else {
                    custom
                }
            }
            ShuffleMode::Builtin => state.maps.iter().filter(|m| m.builtin).collect(),
        };

        let start = current
            .and_then(|cur| pool.iter().position(|m| m.name == cur.name))
            .map_or(0, |i| i + 1);
        (0..pool.len())
            .map(|offset| pool[(start + offset) % pool.len()])
            .find(|m| current.is_none_or(|cur| cur.name != m.name))
            .cloned()
    }

    fn set_next_map_override(&self, map: MapInfo) {
        debug!("Next map override: {}", map.plain_name());
        self.lock().next_override = Some(map);
    }

    fn set_shuffle_mode(&self, mode: ShuffleMode) {
        self.lock().shuffle = mode;
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn set_paused(&self, paused: bool) {
        self.lock().paused = paused;
    }

    fn broadcast(&self, message: &str) {
        info!("[broadcast] {}", message);
        self.lock().broadcasts.push(message.to_string());
    }

    fn subscribe(&self, events: LifecycleSender) {
        self.lock().events = Some(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn host() -> HeadlessHost {
        HeadlessHost::new(vec![
            MapInfo::new("Ground Zero"),
            MapInfo::new("Frozen Forest"),
            MapInfo::new("[accent]Lava_Pit").with_author("anuke").custom(),
        ])
    }

    fn subscribed() -> (HeadlessHost, UnboundedReceiver<LifecycleEvent>) {
        let host = host();
        let (events, rx) = LifecycleSender::channel();
        host.subscribe(events);
        (host, rx)
    }

    #[test]
    fn test_join_leave_publish_snapshots() {
        let (host, mut rx) = subscribed();
        host.join("a");
        host.join("b");
        assert!(host.leave("a"));
        assert!(!host.leave("nobody"));
        host.chat("b", "hi");

        let events: Vec<LifecycleEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::PlayerJoin {
                    player: Some("a".into()),
                    population: 1
                },
                LifecycleEvent::PlayerJoin {
                    player: Some("b".into()),
                    population: 2
                },
                LifecycleEvent::PlayerLeave {
                    player: Some("a".into()),
                    remaining: 1
                },
                LifecycleEvent::PlayerChat {
                    player: Some("b".into()),
                    message: "hi".into()
                },
            ]
        );
        assert_eq!(host.player_names(), vec!["b"]);
        assert_eq!(host.population(), 1);
    }

    #[test]
    fn test_game_over_snapshot_follows_mode() {
        let (host, mut rx) = subscribed();
        host.join("a");
        host.run_wave();
        host.run_wave();
        let _ = rx.try_recv();

        host.game_over(None, Gamemode::Survival);
        host.game_over(Some(Team::find("crux").unwrap()), Gamemode::Pvp);

        match rx.try_recv().unwrap() {
            LifecycleEvent::GameOver { winner, snapshot } => {
                assert_eq!(winner, None);
                assert!(snapshot.waves && !snapshot.pvp);
                assert_eq!(snapshot.wave, 3);
                assert_eq!(snapshot.population, 1);
                assert_eq!(snapshot.map.unwrap().name, "Ground Zero");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            LifecycleEvent::GameOver { winner, snapshot } => {
                assert_eq!(winner.unwrap().name, "crux");
                assert!(!snapshot.waves && snapshot.pvp);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unsubscribed_host_still_tracks_players() {
        let host = host();
        host.join("a");
        host.chat("a", "alone");
        assert_eq!(host.population(), 1);
    }

    #[test]
    fn test_rotation_and_override() {
        let host = host();
        let current = host.current_map();
        assert_eq!(
            host.next_map(Gamemode::Survival, current.as_ref()).unwrap().name,
            "Frozen Forest"
        );

        host.set_shuffle_mode(ShuffleMode::Custom);
        assert_eq!(
            host.next_map(Gamemode::Survival, current.as_ref()).unwrap().name,
            "[accent]Lava_Pit"
        );

        host.set_shuffle_mode(ShuffleMode::None);
        assert!(host.next_map(Gamemode::Survival, current.as_ref()).is_none());

        host.run_wave();
        host.set_next_map_override(MapInfo::new("Frozen Forest"));
        assert_eq!(
            host.load_next_map(Gamemode::Survival).unwrap().name,
            "Frozen Forest"
        );
        assert_eq!(host.current_map().unwrap().name, "Frozen Forest");
        assert_eq!(host.wave(), 1);
        assert!(host.load_next_map(Gamemode::Survival).is_none());
        assert_eq!(host.current_map().unwrap().name, "Frozen Forest");
    }

    #[test]
    fn test_find_map_by_plain_name() {
        let host = host();
        assert_eq!(host.find_map("lava pit").unwrap().author.as_deref(), Some("anuke"));
        assert_eq!(host.find_map("GROUND_ZERO").unwrap().name, "Ground Zero");
        assert!(host.find_map("nowhere").is_none());
    }
}

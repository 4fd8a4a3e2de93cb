//! Server runtime state backed by persisted settings

use serde_json::Value;
use simlink_core::{Gamemode, Result, SettingsStore, ShuffleMode};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub const KEY_BANS: &str = "bans";
pub const KEY_ADMINS: &str = "admins";
pub const KEY_SHUFFLE_MODE: &str = "shufflemode";
pub const KEY_GLOBAL_RULES: &str = "globalrules";
pub const KEY_LAST_MODE: &str = "lastServerMode";
pub const KEY_ROUND_EXTRA_TIME: &str = "roundExtraTime";

pub const DEFAULT_ROUND_EXTRA_TIME: u32 = 12;
const DEFAULT_GLOBAL_RULES: &str = "{reactorExplosions: false, logicUnitBuild: false}";

struct RuntimeState {
    settings: SettingsStore,
    last_mode: Gamemode,
    shuffle_mode: ShuffleMode,
}

/// Game mode, rotation policy and server lists, shared by the bridge and
/// the console commands
pub struct ServerRuntime {
    state: Mutex<RuntimeState>,
}

impl ServerRuntime {
    /// Fill in missing defaults and parse the persisted modes
    pub fn load(mut settings: SettingsStore) -> Self {
        match settings.path() {
            Some(path) => info!("Using settings file {}", path.display()),
            None => debug!("Using in-memory settings"),
        }

        settings.defaults([
            (KEY_BANS, Value::from("")),
            (KEY_ADMINS, Value::from("")),
            (KEY_SHUFFLE_MODE, Value::from(ShuffleMode::Custom.as_str())),
            (KEY_GLOBAL_RULES, Value::from(DEFAULT_GLOBAL_RULES)),
            (KEY_LAST_MODE, Value::from(Gamemode::Survival.as_str())),
            (KEY_ROUND_EXTRA_TIME, Value::from(DEFAULT_ROUND_EXTRA_TIME)),
        ]);

        let raw_mode = settings.get_string(KEY_LAST_MODE, Gamemode::Survival.as_str());
        let last_mode = raw_mode.parse().unwrap_or_else(|_| {
            warn!("Unknown saved game mode '{}', using survival", raw_mode);
            Gamemode::Survival
        });

        let raw_shuffle = settings.get_string(KEY_SHUFFLE_MODE, ShuffleMode::All.as_str());
        let shuffle_mode = raw_shuffle.parse().unwrap_or_else(|_| {
            warn!("Unknown saved shuffle mode '{}', using all", raw_shuffle);
            ShuffleMode::All
        });

        Self {
            state: Mutex::new(RuntimeState {
                settings,
                last_mode,
                shuffle_mode,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_mode(&self) -> Gamemode {
        self.lock().last_mode
    }

    /// Change the game mode used for the next map and persist it
    pub fn set_last_mode(&self, mode: Gamemode) -> Result<()> {
        let mut state = self.lock();
        state.last_mode = mode;
        state.settings.put(KEY_LAST_MODE, mode.as_str());
        state.settings.save()
    }

    pub fn shuffle_mode(&self) -> ShuffleMode {
        self.lock().shuffle_mode
    }

    /// Change the rotation policy and persist it
    pub fn set_shuffle_mode(&self, mode: ShuffleMode) -> Result<()> {
        let mut state = self.lock();
        state.shuffle_mode = mode;
        state.settings.put(KEY_SHUFFLE_MODE, mode.as_str());
        state.settings.save()
    }

    /// Seconds between game over and the next map
    pub fn round_extra_time(&self) -> u32 {
        self.lock()
            .settings
            .get_u32(KEY_ROUND_EXTRA_TIME, DEFAULT_ROUND_EXTRA_TIME)
    }

    pub fn global_rules(&self) -> String {
        self.lock()
            .settings
            .get_string(KEY_GLOBAL_RULES, DEFAULT_GLOBAL_RULES)
    }

    pub fn banned(&self) -> Vec<String> {
        split_list(&self.lock().settings.get_string(KEY_BANS, ""))
    }

    pub fn admins(&self) -> Vec<String> {
        split_list(&self.lock().settings.get_string(KEY_ADMINS, ""))
    }

    /// Write every setting, defaults included, back to disk
    pub fn save(&self) -> Result<()> {
        self.lock().settings.save()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

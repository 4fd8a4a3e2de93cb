//! Simulation-side domain types shared by the bridge and the console

use crate::error::SimlinkError;
use crate::text::strip_colors;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Game mode used when picking the next map in rotation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gamemode {
    #[default]
    Survival,
    Sandbox,
    Attack,
    Pvp,
    Editor,
}

impl Gamemode {
    pub const ALL: [Gamemode; 5] = [
        Gamemode::Survival,
        Gamemode::Sandbox,
        Gamemode::Attack,
        Gamemode::Pvp,
        Gamemode::Editor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gamemode::Survival => "survival",
            Gamemode::Sandbox => "sandbox",
            Gamemode::Attack => "attack",
            Gamemode::Pvp => "pvp",
            Gamemode::Editor => "editor",
        }
    }
}

impl fmt::Display for Gamemode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gamemode {
    type Err = SimlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gamemode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| SimlinkError::UnknownMode(s.to_string()))
    }
}

/// Map rotation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Stay on the current map
    None,
    /// Rotate through every map
    All,
    /// Only custom maps
    Custom,
    /// Only built-in maps
    Builtin,
}

impl ShuffleMode {
    pub const ALL: [ShuffleMode; 4] = [
        ShuffleMode::None,
        ShuffleMode::All,
        ShuffleMode::Custom,
        ShuffleMode::Builtin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShuffleMode::None => "none",
            ShuffleMode::All => "all",
            ShuffleMode::Custom => "custom",
            ShuffleMode::Builtin => "builtin",
        }
    }
}

impl fmt::Display for ShuffleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShuffleMode {
    type Err = SimlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShuffleMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| SimlinkError::UnknownMode(s.to_string()))
    }
}

/// A playable map
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MapInfo {
    /// Display name, may contain color markup
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Shipped with the game rather than user-provided
    #[serde(default)]
    pub builtin: bool,
}

impl MapInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            author: None,
            builtin: true,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn custom(mut self) -> Self {
        self.builtin = false;
        self
    }

    /// Name with color markup removed
    pub fn plain_name(&self) -> String {
        strip_colors(&self.name)
    }
}

/// A team, as reported in game-over events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    /// Hex color without the leading `#`
    pub color: String,
}

impl Team {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// The neutral team, reported when nobody won
    pub fn derelict() -> Self {
        Self::new("derelict", "4d4e58")
    }

    /// One of the stock teams, looked up by name ignoring case
    pub fn find(name: &str) -> Option<Self> {
        const STOCK: [(&str, &str); 6] = [
            ("derelict", "4d4e58"),
            ("sharded", "ffd37f"),
            ("crux", "f25555"),
            ("malis", "a27ce5"),
            ("green", "54d67d"),
            ("blue", "6c87fd"),
        ];
        STOCK
            .iter()
            .find(|(stock, _)| stock.eq_ignore_ascii_case(name))
            .map(|&(stock, color)| Self::new(stock, color))
    }

    /// Team name wrapped in chat color markup
    pub fn colored_name(&self) -> String {
        format!("[#{}]{}[]", self.color, self.name)
    }
}

/// Rule and population snapshot taken when a game ends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    /// Wave-based rules are active
    pub waves: bool,
    /// Player-versus-player rules are active
    pub pvp: bool,
    pub wave: u32,
    pub population: usize,
    pub map: Option<MapInfo>,
}

/// Event delivered by the simulation engine to the lifecycle bridge.
///
/// Population counts are snapshots taken by the host when the event fired.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    PlayerJoin {
        player: Option<String>,
        /// Population including the joining player
        population: usize,
    },
    PlayerLeave {
        player: Option<String>,
        /// Population after the player left
        remaining: usize,
    },
    PlayerChat {
        player: Option<String>,
        message: String,
    },
    GameOver {
        winner: Option<Team>,
        snapshot: GameSnapshot,
    },
    /// Operator-issued pause or resume
    PauseRequested { paused: bool },
}

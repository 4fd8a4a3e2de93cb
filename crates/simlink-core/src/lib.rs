//! # simlink-core
//!
//! Core types for the simlink control channel.
//!
//! This crate provides the foundational pieces used across all simlink crates:
//! - Error type and `Result` alias
//! - Envelope type and line codec for the gateway protocol
//! - Persisted key/value settings
//! - Simulation domain types (game modes, maps, teams, lifecycle events)

pub mod codec;
pub mod error;
pub mod model;
pub mod settings;
pub mod text;

pub use codec::{Decoded, Envelope, decode, encode, encode_envelope};
pub use error::{Result, SimlinkError};
pub use model::{GameSnapshot, Gamemode, LifecycleEvent, MapInfo, ShuffleMode, Team};
pub use settings::SettingsStore;

//! Simulation-side half of simlink
//!
//! This crate provides:
//! - `SimulationHost`: the trait a game engine implements, plus `HeadlessHost`
//! - The auto-pause state machine and the lifecycle bridge task that turns
//!   engine events into `CHAT_MESSAGE` notifications
//! - `ServerRuntime`: game mode, rotation policy and server lists backed by
//!   persisted settings
//! - Gateway handlers (`DISCORD_MESSAGE`, `HELLO`) and the built-in console
//!   commands

pub mod commands;
pub mod handlers;
pub mod headless;
pub mod host;
pub mod lifecycle;
pub mod pause;
pub mod runtime;

pub use commands::{CommandContext, register_headless_commands, register_server_commands};
pub use handlers::{DISCORD_MESSAGE, HELLO, ServerInfo, register_handlers};
pub use headless::HeadlessHost;
pub use host::SimulationHost;
pub use lifecycle::{CHAT_MESSAGE, LifecycleBridge, LifecycleSender};
pub use pause::{PauseMachine, PauseState};
pub use runtime::ServerRuntime;

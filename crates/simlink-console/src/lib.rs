//! # simlink-console
//!
//! The server's embedded command console.
//!
//! This crate provides:
//! - `CommandHandler`: an ordered command table with `<required>` / `[optional]` /
//!   `[rest...]` argument parsing
//! - `CommandResolver`: runs non-protocol input lines as commands and suggests
//!   the closest command name when one is mistyped

pub mod command;
pub mod resolver;

pub use command::{Command, CommandFn, CommandHandler, CommandParam, CommandResponse};
pub use resolver::{CommandResolver, DEFAULT_CONFIRM_TOKEN, Resolution, levenshtein};

//! Command-fallback resolver
//!
//! Lines that are not gateway messages land here. They are run against the
//! command table; unknown names get a "did you mean" suggestion picked by
//! edit distance.

use crate::command::{Command, CommandHandler, CommandResponse};
use std::sync::Arc;
use tracing::{debug, error};

/// Word used to answer yes/no confirmations; never offered as a suggestion
pub const DEFAULT_CONFIRM_TOKEN: &str = "yes";

/// Suggestions must be strictly closer than this
pub const MAX_SUGGESTION_DISTANCE: usize = 3;

/// What the resolver told the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Executed,
    /// The command ran but failed; carries the failure text
    Failed(String),
    /// Unknown command with a close match
    DidYouMean(String),
    /// Unknown command, nothing close enough
    InvalidCommand,
    TooFewArguments { usage: String },
    TooManyArguments { usage: String },
}

impl Resolution {
    /// Operator-facing message, `None` when the command ran cleanly
    pub fn message(&self) -> Option<String> {
        match self {
            Resolution::Executed => None,
            Resolution::Failed(error) => Some(format!("Command failed: {}", error)),
            Resolution::DidYouMean(name) => {
                Some(format!("Command not found. Did you mean \"{}\"?", name))
            }
            Resolution::InvalidCommand => {
                Some("Invalid command. Type 'help' for help.".to_string())
            }
            Resolution::TooFewArguments { usage } => {
                Some(format!("Too few command arguments. Usage: {}", usage))
            }
            Resolution::TooManyArguments { usage } => {
                Some(format!("Too many command arguments. Usage: {}", usage))
            }
        }
    }
}

/// Routes console lines into the command table
pub struct CommandResolver {
    handler: Arc<CommandHandler>,
    confirm_token: String,
}

impl CommandResolver {
    pub fn new(handler: Arc<CommandHandler>) -> Self {
        Self::with_confirm_token(handler, DEFAULT_CONFIRM_TOKEN)
    }

    pub fn with_confirm_token(handler: Arc<CommandHandler>, token: impl Into<String>) -> Self {
        Self {
            handler,
            confirm_token: token.into(),
        }
    }

    /// Run one console line and report the outcome
    pub fn resolve(&self, line: &str) -> Resolution {
        let resolution = match self.handler.handle_message(line) {
            CommandResponse::Executed { command } => {
                debug!("Executed command: {}", command.text);
                Resolution::Executed
            }
            CommandResponse::Failed { command, error } => {
                debug!("Command {} failed", command.text);
                Resolution::Failed(error)
            }
            CommandResponse::UnknownCommand { attempted } => match self.closest(&attempted) {
                Some(command) if command.text != self.confirm_token => {
                    Resolution::DidYouMean(command.text.clone())
                }
                _ => Resolution::InvalidCommand,
            },
            CommandResponse::FewArguments { command } => Resolution::TooFewArguments {
                usage: command.usage(),
            },
            CommandResponse::ManyArguments { command } => Resolution::TooManyArguments {
                usage: command.usage(),
            },
        };

        if let Some(message) = resolution.message() {
            error!("{}", message);
        }
        resolution
    }

    /// First command at the smallest distance below the suggestion limit
    pub fn closest(&self, attempted: &str) -> Option<&Arc<Command>> {
        let mut closest: Option<(&Arc<Command>, usize)> = None;

        for command in self.handler.commands() {
            let distance = levenshtein(&command.text, attempted);
            if distance >= MAX_SUGGESTION_DISTANCE {
                continue;
            }
            if closest.is_none_or(|(_, best)| distance < best) {
                closest = Some((command, distance));
            }
        }

        closest.map(|(command, _)| command)
    }
}

/// Edit distance counted in chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

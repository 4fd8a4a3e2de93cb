//! Command table and argument parsing
//!
//! Parameter text follows the usual console convention: `<name>` is
//! required, `[name]` is optional, and a trailing `...` on the last
//! parameter makes it swallow the rest of the line.

use simlink_core::{Result, SimlinkError};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Callback run when a command matches
pub type CommandFn = Arc<dyn Fn(&[String]) -> Result<()> + Send + Sync>;

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParam {
    pub name: String,
    pub optional: bool,
    pub variadic: bool,
}

/// A registered console command
pub struct Command {
    /// Command name, matched case-sensitively
    pub text: String,
    /// Parameter text as declared, e.g. `<map> [mode]`
    pub param_text: String,
    pub description: String,
    pub params: Vec<CommandParam>,
    runner: CommandFn,
}

impl Command {
    /// Number of parameters that must be supplied
    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    fn variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// `name params`, as shown in usage messages
    pub fn usage(&self) -> String {
        format!("{} {}", self.text, self.param_text)
            .trim_end()
            .to_string()
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.text)
            .field("param_text", &self.param_text)
            .finish()
    }
}

/// Result of handing one line to the command table
#[derive(Debug)]
pub enum CommandResponse {
    /// Command ran and returned Ok
    Executed { command: Arc<Command> },
    /// Command ran and returned an error or panicked
    Failed { command: Arc<Command>, error: String },
    /// No command with this name
    UnknownCommand { attempted: String },
    FewArguments { command: Arc<Command> },
    ManyArguments { command: Arc<Command> },
}

/// Registry of console commands, in registration order
#[derive(Default)]
pub struct CommandHandler {
    commands: Vec<Arc<Command>>,
    index: HashMap<String, usize>,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Registering an existing name replaces it in place.
    pub fn register<F>(
        &mut self,
        text: &str,
        param_text: &str,
        description: &str,
        runner: F,
    ) -> Result<()>
    where
        F: Fn(&[String]) -> Result<()> + Send + Sync + 'static,
    {
        let params = parse_params(text, param_text)?;
        let command = Arc::new(Command {
            text: text.to_string(),
            param_text: param_text.to_string(),
            description: description.to_string(),
            params,
            runner: Arc::new(runner),
        });

        match self.index.get(text) {
            Some(&slot) => self.commands[slot] = command,
            None => {
                self.index.insert(text.to_string(), self.commands.len());
                self.commands.push(command);
            }
        }
        Ok(())
    }

    /// Commands in registration order
    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }

    pub fn get(&self, text: &str) -> Option<&Arc<Command>> {
        self.index.get(text).map(|&slot| &self.commands[slot])
    }

    /// Parse and run one line
    pub fn handle_message(&self, line: &str) -> CommandResponse {
        let line = line.trim();
        let (name, argstr) = match line.find(char::is_whitespace) {
            Some(split) => (&line[..split], &line[split..]),
            None => (line, ""),
        };

        let Some(command) = self.get(name).cloned() else {
            return CommandResponse::UnknownCommand {
                attempted: name.to_string(),
            };
        };

        let args = split_args(&command, argstr);
        if args.len() < command.required() {
            return CommandResponse::FewArguments { command };
        }
        if args.len() > command.params.len() {
            return CommandResponse::ManyArguments { command };
        }

        match catch_unwind(AssertUnwindSafe(|| (command.runner)(&args))) {
            Ok(Ok(())) => CommandResponse::Executed { command },
            Ok(Err(e)) => CommandResponse::Failed {
                command,
                error: e.to_string(),
            },
            Err(_) => CommandResponse::Failed {
                command,
                error: "command panicked".to_string(),
            },
        }
    }
}

fn split_args(command: &Command, argstr: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut rest = argstr.trim_start();

    while !rest.is_empty() {
        if command.variadic() && args.len() + 1 == command.params.len() {
            args.push(rest.trim_end().to_string());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        args.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }

    args
}

fn parse_params(command: &str, param_text: &str) -> Result<Vec<CommandParam>> {
    let invalid = |reason: String| SimlinkError::InvalidCommandSpec {
        command: command.to_string(),
        reason,
    };

    let tokens: Vec<&str> = param_text.split_whitespace().collect();
    let mut params = Vec::with_capacity(tokens.len());

    for (i, token) in tokens.iter().enumerate() {
        let (inner, optional) = if let Some(inner) =
            token.strip_prefix('<').and_then(|t| t.strip_suffix('>'))
        {
            (inner, false)
        } else if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            (inner, true)
        } else {
            return Err(invalid(format!("malformed parameter '{}'", token)));
        };

        let (name, variadic) = match inner.strip_suffix("...") {
            Some(name) => (name, true),
            None => (inner, false),
        };

        if name.is_empty() {
            return Err(invalid(format!("empty parameter name in '{}'", token)));
        }
        if variadic && i + 1 != tokens.len() {
            return Err(invalid(format!("variadic parameter '{}' must be last", name)));
        }
        if !optional && params.iter().any(|p: &CommandParam| p.optional) {
            return Err(invalid(format!(
                "required parameter '{}' follows an optional one",
                name
            )));
        }

        params.push(CommandParam {
            name: name.to_string(),
            optional,
            variadic,
        });
    }

    Ok(params)
}

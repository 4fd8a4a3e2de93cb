//! Error types for simlink

use thiserror::Error;

/// Result type for simlink operations
pub type Result<T> = std::result::Result<T, SimlinkError>;

/// simlink error types
#[derive(Debug, Error)]
pub enum SimlinkError {
    /// Valid JSON that is not a `{type, payload}` envelope
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Envelope type with no registered handler
    #[error("Unhandled message type: {0}")]
    UnhandledType(String),

    /// Payload does not match the shape the handler declared
    #[error("Payload mismatch for {message_type}: {reason}")]
    PayloadMismatch {
        message_type: String,
        reason: String,
    },

    /// Handler returned an error
    #[error("Handler for {message_type} failed: {reason}")]
    HandlerFailed {
        message_type: String,
        reason: String,
    },

    /// Handler panicked
    #[error("Handler for {0} panicked")]
    HandlerPanicked(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stream read/write error
    #[error("IO error: {0}")]
    Io(String),

    /// Console command failed
    #[error("Command error: {0}")]
    Command(String),

    /// Malformed command parameter text at registration
    #[error("Invalid parameters for command {command}: {reason}")]
    InvalidCommandSpec { command: String, reason: String },

    /// Persisted settings could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// Unknown game mode or shuffle mode name
    #[error("Unknown mode: {0}")]
    UnknownMode(String),
}

impl From<serde_json::Error> for SimlinkError {
    fn from(err: serde_json::Error) -> Self {
        SimlinkError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SimlinkError {
    fn from(err: std::io::Error) -> Self {
        SimlinkError::Io(err.to_string())
    }
}

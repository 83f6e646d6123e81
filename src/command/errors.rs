//! # Command Errors
//!
//! Decoding failures for inbound command units. Any of these rejects the
//! whole unit.

use thiserror::Error;

/// Result type for command decoding
pub type CommandResult<T> = Result<T, CommandError>;

/// Command decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Not valid JSON at all
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// Valid JSON that is neither an object nor an array of objects
    #[error("Command unit must be an object or an array of objects")]
    NotAUnit,

    /// A command object failed to decode
    #[error("Invalid command at index {index}: {reason}")]
    InvalidCommand { index: usize, reason: String },

    /// A push notification broke a field rule
    #[error("Invalid push notification: {0}")]
    InvalidPush(String),
}

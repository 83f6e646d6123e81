//! # Transport Errors

use thiserror::Error;

use crate::hub::HubError;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Bind address could not be parsed or bound
    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    /// WebSocket handshake failed
    #[error("WebSocket handshake failed: {0}")]
    Handshake(String),

    /// Hub access failed
    #[error(transparent)]
    Hub(#[from] HubError),
}

//! # Transport
//!
//! Network front end that turns connections into hub subscribers.

pub mod errors;
pub mod websocket;

pub use errors::{TransportError, TransportResult};
pub use websocket::{handle_frame, WebSocketServer};

//! # Inbound Commands
//!
//! Typed command units and their application to a hub.
//!
//! A unit is decoded completely before anything is applied, so a malformed
//! unit changes nothing.

pub mod apply;
pub mod errors;
pub mod model;

pub use apply::{apply, ApplyReport};
pub use errors::{CommandError, CommandResult};
pub use model::{
    Command, CommandUnit, DeliveryMethod, MembershipChange, Pong, PushNotification, PushTarget,
};

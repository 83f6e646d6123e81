//! # Hub Errors
//!
//! Error types for the fan-out hub.
//!
//! Lookup misses (unknown channel, unknown group, absent membership) are
//! ordinary no-ops and never surface here. Delivery failures are
//! fire-and-forget and are reported through `DispatchReport`, not errors.

use thiserror::Error;

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

/// Hub errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub mutex was poisoned by a panicking holder
    #[error("Hub lock poisoned")]
    LockPoisoned,
}

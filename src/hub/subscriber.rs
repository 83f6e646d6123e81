//! # Subscribers
//!
//! Opaque handles to push-capable connections.
//!
//! A handle owns the sending half of an unbounded outbound queue. The
//! transport drains the receiving half onto the wire. Liveness is derived
//! from the queue: once the receiver is dropped, or the handle is closed
//! explicitly, the subscriber is `Closed` for good.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Outbound frame sender for a subscriber
pub type OutboundSender = mpsc::UnboundedSender<String>;

/// Outbound frame receiver, drained by the transport
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Stable identifier assigned to a subscriber when it connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Create an id from its raw value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Liveness {
    Open,
    Closed,
}

/// Handle to a subscriber connection
///
/// Cheap to clone. Clones share the same queue and the same closed flag, so
/// a scheduled delivery holding a clone observes a disconnect that happens
/// after it was scheduled.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    sender: OutboundSender,
    closed: Arc<AtomicBool>,
}

impl SubscriberHandle {
    /// Wrap an existing outbound sender
    pub fn new(id: SubscriberId, sender: OutboundSender) -> Self {
        Self {
            id,
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a handle together with the receiver its frames land on
    pub fn channel(id: SubscriberId) -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(id, tx), rx)
    }

    /// Subscriber id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Current liveness
    pub fn liveness(&self) -> Liveness {
        if self.closed.load(Ordering::Acquire) || self.sender.is_closed() {
            Liveness::Closed
        } else {
            Liveness::Open
        }
    }

    /// Whether the subscriber is `Open`
    pub fn is_open(&self) -> bool {
        self.liveness() == Liveness::Open
    }

    /// Mark the subscriber closed. Irreversible.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Queue a serialized frame
    ///
    /// Fire-and-forget: returns whether the frame was queued. A closed
    /// subscriber silently drops the frame.
    pub fn send(&self, frame: String) -> bool {
        if !self.is_open() {
            return false;
        }
        self.sender.send(frame).is_ok()
    }
}

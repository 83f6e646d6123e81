//! # Delivery Scheduler
//!
//! Runs per-recipient deliveries, either inline or after a delay.
//!
//! Each delivery owns an immutable snapshot of its target handle and its
//! serialized frame. Nothing points back into the registry, so a recipient
//! removed between scheduling and firing is simply found `Closed`.
//! Deliveries cannot be cancelled; the liveness re-check at fire time is
//! the only cancellation.

use std::time::Duration;

use tokio::runtime::Handle;

use super::subscriber::SubscriberHandle;

/// One frame bound for one subscriber
#[derive(Debug, Clone)]
pub struct Delivery {
    target: SubscriberHandle,
    frame: String,
}

impl Delivery {
    pub fn new(target: SubscriberHandle, frame: String) -> Self {
        Self { target, frame }
    }

    pub fn target(&self) -> &SubscriberHandle {
        &self.target
    }

    /// Send the frame if the target is still open
    pub fn fire(self) -> bool {
        if !self.target.is_open() {
            tracing::trace!(subscriber = %self.target.id(), "Skipping delivery to closed subscriber");
            return false;
        }
        self.target.send(self.frame)
    }
}

/// How a delivery was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// Fired inline; carries whether the frame was queued
    Immediate(bool),
    /// Handed to a timer task
    Deferred,
}

/// Schedules deliveries on whichever tokio runtime is current
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryScheduler;

impl DeliveryScheduler {
    /// Fire `delivery` after `delay`
    ///
    /// A zero delay fires inline. Without a runtime to host the timer the
    /// delivery also fires inline.
    pub fn schedule(&self, delay: Duration, delivery: Delivery) -> Scheduled {
        if delay.is_zero() {
            return Scheduled::Immediate(delivery.fire());
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(
                    subscriber = %delivery.target().id(),
                    delay_ms = delay.as_millis() as u64,
                    "No runtime for delayed delivery, sending now"
                );
                return Scheduled::Immediate(delivery.fire());
            }
        };

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            delivery.fire();
        });
        Scheduled::Deferred
    }
}

//! # Dispatcher
//!
//! Targeted sends and broadcasts over registry membership.
//!
//! Best-effort delivery. Lookup misses and closed subscribers are skipped
//! silently and nothing is cleaned up from here: membership only changes on
//! subscribe, unsubscribe and disconnect.

use std::time::Duration;

use serde::Serialize;

use super::message::{annotate, LogicalId, Payload};
use super::registry::Registry;
use super::scheduler::{Delivery, DeliveryScheduler, Scheduled};
use super::subscriber::SubscriberHandle;

/// Outcome of one targeted send or broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Memberships that qualified as recipients
    pub matched: usize,
    /// Frames queued inline
    pub delivered: usize,
    /// Frames handed to the scheduler for later
    pub deferred: usize,
    /// Recipients skipped because they were closed
    pub skipped_closed: usize,
}

impl DispatchReport {
    fn record(&mut self, scheduled: Scheduled) {
        match scheduled {
            Scheduled::Immediate(true) => self.delivered += 1,
            Scheduled::Immediate(false) => self.skipped_closed += 1,
            Scheduled::Deferred => self.deferred += 1,
        }
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: DispatchReport) {
        self.matched += other.matched;
        self.delivered += other.delivered;
        self.deferred += other.deferred;
        self.skipped_closed += other.skipped_closed;
    }
}

/// Fan-out engine
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    scheduler: DeliveryScheduler,
}

impl Dispatcher {
    /// Deliver `payload` to every open member of each named group in `channel`
    pub fn send_targeted(
        &self,
        registry: &Registry,
        channel: &str,
        logical_ids: &[LogicalId],
        payload: &Payload,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(entry) = registry.channel(channel) else {
            tracing::debug!(channel = %channel, "Targeted send to unknown channel");
            return report;
        };
        let Some(frame) = serialize(payload, channel) else {
            return report;
        };

        for logical_id in logical_ids {
            let Some(group) = entry.group(logical_id) else {
                continue;
            };
            for handle in group.members() {
                report.matched += 1;
                if !handle.is_open() {
                    report.skipped_closed += 1;
                    continue;
                }
                report.record(Scheduled::Immediate(handle.send(frame.clone())));
            }
        }

        tracing::debug!(channel = %channel, report = ?report, "Targeted send");
        report
    }

    /// Deliver `payload` to every member of `channel` outside `exclude`'s group
    ///
    /// The payload is copied and tagged with `CANAL_NAME` first. With a
    /// non-zero `throttle_ms`, the Nth open recipient (counting from zero,
    /// across all groups) fires `N * throttle_ms` milliseconds from now and
    /// re-checks liveness when it fires.
    pub fn broadcast(
        &self,
        registry: &Registry,
        channel: &str,
        payload: &Payload,
        exclude: Option<&LogicalId>,
        throttle_ms: u64,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(entry) = registry.channel(channel) else {
            tracing::debug!(channel = %channel, "Broadcast to unknown channel");
            return report;
        };
        let Some(frame) = serialize(&annotate(payload, channel), channel) else {
            return report;
        };

        let recipients: Vec<&SubscriberHandle> = entry
            .groups()
            .filter(|(logical_id, _)| Some(*logical_id) != exclude)
            .flat_map(|(_, group)| group.members())
            .collect();

        let mut slot: u64 = 0;
        for handle in recipients {
            report.matched += 1;
            if !handle.is_open() {
                report.skipped_closed += 1;
                continue;
            }
            let delay = Duration::from_millis(slot.saturating_mul(throttle_ms));
            slot += 1;
            let scheduled = self
                .scheduler
                .schedule(delay, Delivery::new(handle.clone(), frame.clone()));
            report.record(scheduled);
        }

        tracing::debug!(
            channel = %channel,
            throttle_ms = throttle_ms,
            report = ?report,
            "Broadcast"
        );
        report
    }
}

fn serialize(payload: &Payload, channel: &str) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::error!(channel = %channel, error = %e, "Failed to serialize payload");
            None
        }
    }
}

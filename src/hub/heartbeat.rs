//! # Heartbeat Coordination
//!
//! Owns the single delegate slot. The delegate is the one subscriber told
//! to originate keepalive probes toward the others; this module only picks
//! it, it never pings anyone itself.
//!
//! The slot is `Vacant` or `Assigned`. When assigned it references a
//! subscriber that was open at the last check; the monitor and disconnect
//! handling re-validate that.

use serde::Serialize;

use super::message::DelegateMission;
use super::registry::Registry;
use super::subscriber::{SubscriberHandle, SubscriberId};

/// Default probe interval handed to the delegate
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 30_000;

/// Delegate presence and liveness, for snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelegateStatus {
    pub subscriber_id: SubscriberId,
    pub open: bool,
}

/// Result of a liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Delegate assigned and open
    Healthy(SubscriberId),
    /// A new delegate took the slot
    Elected(SubscriberId),
    /// No candidate; the slot is vacant
    Vacant,
}

/// Delegate slot and election policy
#[derive(Debug)]
pub struct HeartbeatCoordinator {
    delegate: Option<SubscriberHandle>,
    keepalive_interval_ms: u64,
}

impl Default for HeartbeatCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_KEEPALIVE_INTERVAL_MS)
    }
}

impl HeartbeatCoordinator {
    pub fn new(keepalive_interval_ms: u64) -> Self {
        Self {
            delegate: None,
            keepalive_interval_ms,
        }
    }

    pub fn keepalive_interval_ms(&self) -> u64 {
        self.keepalive_interval_ms
    }

    pub fn delegate(&self) -> Option<&SubscriberHandle> {
        self.delegate.as_ref()
    }

    pub fn delegate_id(&self) -> Option<SubscriberId> {
        self.delegate.as_ref().map(SubscriberHandle::id)
    }

    pub fn is_delegate(&self, id: SubscriberId) -> bool {
        self.delegate_id() == Some(id)
    }

    pub fn status(&self) -> Option<DelegateStatus> {
        self.delegate.as_ref().map(|d| DelegateStatus {
            subscriber_id: d.id(),
            open: d.is_open(),
        })
    }

    /// Put `handle` in the slot and send it the keepalive mission
    ///
    /// If the mission cannot be queued the slot reverts to vacant.
    pub fn assign_delegate(&mut self, handle: &SubscriberHandle) -> bool {
        self.delegate = Some(handle.clone());

        let mission = DelegateMission::new(self.keepalive_interval_ms);
        let sent = match serde_json::to_string(&mission) {
            Ok(frame) => handle.send(frame),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize delegate mission");
                false
            }
        };

        if sent {
            tracing::info!(
                subscriber = %handle.id(),
                interval_ms = self.keepalive_interval_ms,
                "Keepalive delegate assigned"
            );
        } else {
            tracing::debug!(subscriber = %handle.id(), "Delegate candidate closed, slot vacant");
            self.delegate = None;
        }
        sent
    }

    /// Called when a subscriber registers for the first time
    ///
    /// The newcomer takes the slot only if nobody holds it.
    pub fn on_registered(&mut self, handle: &SubscriberHandle) -> Option<SubscriberId> {
        if self.delegate.is_some() {
            return None;
        }
        self.assign_delegate(handle).then(|| handle.id())
    }

    /// Elect the first open known subscriber other than `outgoing`
    ///
    /// Candidates are scanned in the registry's known-subscriber order. The
    /// slot ends up vacant if nobody qualifies.
    pub fn elect(&mut self, registry: &Registry, outgoing: Option<SubscriberId>) -> Option<SubscriberId> {
        self.delegate = None;

        for candidate in registry.known_subscribers() {
            if Some(candidate.id()) == outgoing || !candidate.is_open() {
                continue;
            }
            if self.assign_delegate(candidate) {
                return Some(candidate.id());
            }
        }

        if let Some(id) = outgoing {
            tracing::info!(previous = %id, "No delegate candidate, slot vacant");
        }
        None
    }

    /// Periodic liveness check
    ///
    /// A healthy delegate is left alone. A closed delegate, or a vacant
    /// slot, triggers an election.
    pub fn monitor(&mut self, registry: &Registry) -> MonitorOutcome {
        let outgoing = match &self.delegate {
            Some(delegate) if delegate.is_open() => return MonitorOutcome::Healthy(delegate.id()),
            Some(delegate) => {
                tracing::debug!(subscriber = %delegate.id(), "Delegate found closed");
                Some(delegate.id())
            }
            None => None,
        };

        match self.elect(registry, outgoing) {
            Some(id) => MonitorOutcome::Elected(id),
            None => MonitorOutcome::Vacant,
        }
    }

    /// Re-elect if `id`, which is disconnecting, holds the slot
    ///
    /// Must run before `id`'s memberships are removed so the candidate pool
    /// still reflects the remaining subscribers.
    pub fn on_disconnect(&mut self, registry: &Registry, id: SubscriberId) -> Option<MonitorOutcome> {
        if !self.is_delegate(id) {
            return None;
        }
        Some(match self.elect(registry, Some(id)) {
            Some(next) => MonitorOutcome::Elected(next),
            None => MonitorOutcome::Vacant,
        })
    }

    /// Empty the slot without electing
    pub fn clear(&mut self) {
        self.delegate = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::message::LogicalId;
    use crate::hub::subscriber::OutboundReceiver;
    use serde_json::{json, Value};

    fn sub(raw: u64) -> (SubscriberHandle, OutboundReceiver) {
        SubscriberHandle::channel(SubscriberId::new(raw))
    }

    #[test]
    fn test_first_registration_takes_vacant_slot() {
        let mut coordinator = HeartbeatCoordinator::new(5_000);
        let (a, mut ra) = sub(1);
        let (b, _rb) = sub(2);

        assert_eq!(coordinator.on_registered(&a), Some(a.id()));
        assert_eq!(coordinator.on_registered(&b), None);
        assert!(coordinator.is_delegate(a.id()));

        let mission: Value = serde_json::from_str(&ra.try_recv().unwrap()).unwrap();
        assert_eq!(
            mission,
            json!({"MESSAGE_CODE": "DELEGATE_KEEP_ALIVE_MISSION", "INTERVAL": 5000})
        );
    }

    #[test]
    fn test_assign_to_closed_reverts_to_vacant() {
        let mut coordinator = HeartbeatCoordinator::default();
        let (a, ra) = sub(1);
        drop(ra);

        assert!(!coordinator.assign_delegate(&a));
        assert!(coordinator.delegate().is_none());
    }

    #[test]
    fn test_monitor_reelects_when_delegate_closed() {
        let mut registry = Registry::new();
        let mut coordinator = HeartbeatCoordinator::default();
        let (a, ra) = sub(1);
        let (b, _rb) = sub(2);
        registry.subscribe(&a, "room", &LogicalId::from("u1"));
        registry.subscribe(&b, "room", &LogicalId::from("u2"));

        coordinator.assign_delegate(&a);
        assert_eq!(coordinator.monitor(&registry), MonitorOutcome::Healthy(a.id()));

        drop(ra);
        assert_eq!(coordinator.monitor(&registry), MonitorOutcome::Elected(b.id()));
        assert_eq!(
            coordinator.status(),
            Some(DelegateStatus {
                subscriber_id: b.id(),
                open: true
            })
        );
    }

    #[test]
    fn test_monitor_vacates_when_no_candidate() {
        let mut registry = Registry::new();
        let mut coordinator = HeartbeatCoordinator::default();
        let (a, ra) = sub(1);
        registry.subscribe(&a, "room", &LogicalId::from("u1"));
        coordinator.assign_delegate(&a);

        drop(ra);
        assert_eq!(coordinator.monitor(&registry), MonitorOutcome::Vacant);
        assert!(coordinator.status().is_none());
    }

    #[test]
    fn test_on_disconnect_ignores_non_delegate() {
        let registry = Registry::new();
        let mut coordinator = HeartbeatCoordinator::default();
        let (a, _ra) = sub(1);
        coordinator.assign_delegate(&a);

        assert_eq!(coordinator.on_disconnect(&registry, SubscriberId::new(9)), None);
        assert!(coordinator.is_delegate(a.id()));
    }
}

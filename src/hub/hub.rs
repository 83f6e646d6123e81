//! # Hub
//!
//! The explicitly constructed owner of all fan-out state: the membership
//! registry, the dispatcher and the delegate slot. Independent instances
//! share nothing.
//!
//! `Hub` itself is single-threaded (`&mut self` entry points). `SharedHub`
//! serializes every entry point behind one mutex for use from tasks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::dispatcher::{DispatchReport, Dispatcher};
use super::errors::{HubError, HubResult};
use super::heartbeat::{HeartbeatCoordinator, MonitorOutcome, DEFAULT_KEEPALIVE_INTERVAL_MS};
use super::message::{member_disconnected, LogicalId, Payload};
use super::registry::{Registry, SubscribeOutcome};
use super::snapshot::HubSnapshot;
use super::subscriber::{OutboundReceiver, SubscriberHandle, SubscriberId};

/// What `remove_subscriber` did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalReport {
    /// Memberships the subscriber held when it left
    pub memberships: usize,
    /// Disconnect notices delivered to remaining members
    pub notices: DispatchReport,
    /// Delegate change caused by the departure
    pub delegate: Option<MonitorOutcome>,
    /// Entries only the final purge caught
    pub residual: usize,
}

/// Fan-out hub
#[derive(Debug)]
pub struct Hub {
    registry: Registry,
    dispatcher: Dispatcher,
    heartbeat: HeartbeatCoordinator,
    next_id: u64,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::with_keepalive_interval(DEFAULT_KEEPALIVE_INTERVAL_MS)
    }

    /// Hub whose delegate is told to probe every `interval_ms`
    pub fn with_keepalive_interval(interval_ms: u64) -> Self {
        Self {
            registry: Registry::new(),
            dispatcher: Dispatcher::default(),
            heartbeat: HeartbeatCoordinator::new(interval_ms),
            next_id: 1,
        }
    }

    /// Assign the next subscriber id
    pub fn next_subscriber_id(&mut self) -> SubscriberId {
        let id = SubscriberId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// New subscriber handle with a fresh id
    ///
    /// The subscriber is not registered until its first `subscribe`.
    pub fn connect(&mut self) -> (SubscriberHandle, OutboundReceiver) {
        SubscriberHandle::channel(self.next_subscriber_id())
    }

    pub fn subscribe(
        &mut self,
        handle: &SubscriberHandle,
        channel: &str,
        logical_id: &LogicalId,
    ) -> SubscribeOutcome {
        let outcome = self.registry.subscribe(handle, channel, logical_id);

        if let Some(previous) = &outcome.moved_from {
            tracing::debug!(
                subscriber = %handle.id(),
                channel = %channel,
                from = %previous,
                to = %logical_id,
                "Subscriber moved between groups"
            );
        } else if outcome.added {
            tracing::debug!(
                subscriber = %handle.id(),
                channel = %channel,
                logical_id = %logical_id,
                "Subscribed"
            );
        }

        if outcome.first_registration {
            self.heartbeat.on_registered(handle);
        }
        outcome
    }

    pub fn unsubscribe(&mut self, id: SubscriberId, channel: &str, logical_id: &LogicalId) -> bool {
        let removed = self.registry.unsubscribe(id, channel, logical_id);
        if removed {
            tracing::debug!(
                subscriber = %id,
                channel = %channel,
                logical_id = %logical_id,
                "Unsubscribed"
            );
        }
        removed
    }

    /// Drop every membership of a disconnecting subscriber
    ///
    /// Re-elects the delegate first if `id` holds the slot. Then, for each
    /// membership in a snapshot taken up front, notifies the rest of the
    /// channel and unsubscribes. A final purge guarantees nothing of `id`
    /// remains in either index.
    pub fn remove_subscriber(&mut self, id: SubscriberId) -> RemovalReport {
        let memberships = self.registry.memberships(id);
        let leaving = self.registry.handle(id).cloned();
        let mut report = RemovalReport {
            memberships: memberships.len(),
            ..Default::default()
        };

        report.delegate = self.heartbeat.on_disconnect(&self.registry, id);

        for (channel, logical_id) in &memberships {
            let notices = self.dispatcher.broadcast(
                &self.registry,
                channel,
                &member_disconnected(logical_id),
                Some(logical_id),
                0,
            );
            report.notices.merge(notices);
            self.registry.unsubscribe(id, channel, logical_id);
        }

        let channels: Vec<String> = memberships.into_iter().map(|(c, _)| c).collect();
        report.residual = self.registry.purge(id, &channels);
        if report.residual > 0 {
            tracing::warn!(
                subscriber = %id,
                residual = report.residual,
                "Purged leftover entries after disconnect"
            );
        }

        if let Some(handle) = leaving {
            handle.close();
        }

        tracing::debug!(
            subscriber = %id,
            memberships = report.memberships,
            notified = report.notices.delivered,
            "Subscriber removed"
        );
        report
    }

    pub fn send_targeted(
        &self,
        channel: &str,
        logical_ids: &[LogicalId],
        payload: &Payload,
    ) -> DispatchReport {
        self.dispatcher
            .send_targeted(&self.registry, channel, logical_ids, payload)
    }

    pub fn broadcast(
        &self,
        channel: &str,
        payload: &Payload,
        exclude: Option<&LogicalId>,
        throttle_ms: u64,
    ) -> DispatchReport {
        self.dispatcher
            .broadcast(&self.registry, channel, payload, exclude, throttle_ms)
    }

    /// Periodic delegate liveness check
    pub fn monitor(&mut self) -> MonitorOutcome {
        self.heartbeat.monitor(&self.registry)
    }

    pub fn snapshot(&self) -> HubSnapshot {
        HubSnapshot::capture(&self.registry, &self.heartbeat)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn heartbeat(&self) -> &HeartbeatCoordinator {
        &self.heartbeat
    }

    /// Close every known subscriber and reset all state
    ///
    /// Returns the number of subscribers dropped.
    pub fn shutdown(&mut self) -> usize {
        let dropped = self.registry.subscriber_count();
        for handle in self.registry.known_subscribers() {
            handle.close();
        }
        self.registry = Registry::new();
        self.heartbeat.clear();
        tracing::info!(subscribers = dropped, "Hub shut down");
        dropped
    }
}

/// A `Hub` behind one exclusive lock
#[derive(Debug, Clone)]
pub struct SharedHub {
    inner: Arc<Mutex<Hub>>,
}

impl SharedHub {
    pub fn new(hub: Hub) -> Self {
        Self {
            inner: Arc::new(Mutex::new(hub)),
        }
    }

    /// Run `f` with exclusive access to the hub
    pub fn with<R>(&self, f: impl FnOnce(&mut Hub) -> R) -> HubResult<R> {
        let mut hub = self.inner.lock().map_err(|_| HubError::LockPoisoned)?;
        Ok(f(&mut hub))
    }

    /// Spawn the periodic delegate monitor
    ///
    /// The task ticks until aborted; a failed check is logged and retried on
    /// the next tick. Returns a handle that can be used to abort the task.
    pub fn spawn_monitor(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let hub = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match hub.with(|h| h.monitor()) {
                    Ok(MonitorOutcome::Elected(id)) => {
                        tracing::debug!(delegate = %id, "Monitor elected delegate");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Heartbeat monitor check failed");
                    }
                }
            }
        })
    }
}

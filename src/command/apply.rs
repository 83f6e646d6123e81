//! # Command Dispatch
//!
//! Routes decoded commands to the hub, strictly in unit order.

use serde::Serialize;

use super::model::{Command, CommandUnit, PushTarget};
use crate::hub::{DispatchReport, Hub, SubscriberHandle};

/// What applying one unit did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Commands applied
    pub commands: usize,
    /// Memberships added
    pub subscribed: usize,
    /// Memberships removed
    pub unsubscribed: usize,
    /// Per-channel pushes dispatched
    pub pushes: usize,
    /// Pongs acknowledged
    pub pongs: usize,
    /// Combined outcome of every push
    pub dispatch: DispatchReport,
}

/// Apply every command of `unit` on behalf of `sender`
pub fn apply(hub: &mut Hub, sender: &SubscriberHandle, unit: &CommandUnit) -> ApplyReport {
    let mut report = ApplyReport::default();

    for command in unit.commands() {
        match command {
            Command::Subscribe(change) => {
                for channel in &change.channels {
                    if hub.subscribe(sender, channel, &change.logical_id).added {
                        report.subscribed += 1;
                    }
                }
            }
            Command::Unsubscribe(change) => {
                for channel in &change.channels {
                    if hub.unsubscribe(sender.id(), channel, &change.logical_id) {
                        report.unsubscribed += 1;
                    }
                }
            }
            Command::PushNotification(push) => {
                for channel in &push.channels {
                    let dispatched = match &push.target {
                        PushTarget::Broadcast => hub.broadcast(
                            channel,
                            &push.data,
                            Some(&push.sender),
                            push.throttle_ms(),
                        ),
                        PushTarget::Private(receivers) => {
                            hub.send_targeted(channel, receivers, &push.data)
                        }
                    };
                    report.dispatch.merge(dispatched);
                    report.pushes += 1;
                }
            }
            Command::HeartbeatPong(pong) => {
                tracing::trace!(
                    subscriber = %sender.id(),
                    logical_id = ?pong.logical_id,
                    "Heartbeat pong"
                );
                report.pongs += 1;
            }
        }
        report.commands += 1;
    }

    report
}

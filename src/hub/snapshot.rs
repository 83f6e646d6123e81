//! # Hub Snapshot
//!
//! Read-only view of hub state for monitoring endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::heartbeat::{DelegateStatus, HeartbeatCoordinator};
use super::registry::Registry;

/// Per-channel counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub name: String,
    pub group_count: usize,
    pub subscriber_count: usize,
}

/// Point-in-time view of the hub
#[derive(Debug, Clone, Serialize)]
pub struct HubSnapshot {
    pub channel_count: usize,
    pub subscriber_count: usize,
    pub delegate: Option<DelegateStatus>,
    /// Channels sorted by name
    pub channels: Vec<ChannelSnapshot>,
    pub taken_at: DateTime<Utc>,
}

impl HubSnapshot {
    pub(crate) fn capture(registry: &Registry, heartbeat: &HeartbeatCoordinator) -> Self {
        let mut channels: Vec<ChannelSnapshot> = registry
            .channels()
            .map(|(name, channel)| ChannelSnapshot {
                name: name.to_string(),
                group_count: channel.group_count(),
                subscriber_count: channel.subscriber_count(),
            })
            .collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            channel_count: registry.channel_count(),
            subscriber_count: registry.subscriber_count(),
            delegate: heartbeat.status(),
            channels,
            taken_at: Utc::now(),
        }
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelSnapshot> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }
}

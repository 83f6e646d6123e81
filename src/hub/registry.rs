//! # Membership Registry
//!
//! Channel → logical group → subscriber index, plus the reverse index from
//! each subscriber to the `(channel, logical id)` pairs it holds.
//!
//! ## Invariants
//! - A channel exists iff it has at least one non-empty group.
//! - A group exists iff it has at least one subscriber.
//! - A subscriber has a reverse entry iff it holds at least one membership.
//! - A subscriber holds at most one logical id per channel. Subscribing under
//!   a second id moves it out of the first group.
//!
//! Groups within a channel and subscribers within a group enumerate in
//! insertion order.

use std::collections::{BTreeMap, HashMap};

use hashlink::LinkedHashMap;

use super::message::LogicalId;
use super::subscriber::{SubscriberHandle, SubscriberId};

/// Subscribers sharing one logical id within a channel
#[derive(Debug)]
pub struct Group {
    members: LinkedHashMap<SubscriberId, SubscriberHandle>,
}

impl Group {
    fn new() -> Self {
        Self {
            members: LinkedHashMap::new(),
        }
    }

    /// Members in insertion order
    pub fn members(&self) -> impl Iterator<Item = &SubscriberHandle> {
        self.members.iter().map(|(_, handle)| handle)
    }

    /// Whether subscriber `id` is in this group
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members.contains_key(&id)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A named channel and its groups
#[derive(Debug)]
pub struct Channel {
    groups: LinkedHashMap<LogicalId, Group>,
}

impl Channel {
    fn new() -> Self {
        Self {
            groups: LinkedHashMap::new(),
        }
    }

    /// Groups in insertion order
    pub fn groups(&self) -> impl Iterator<Item = (&LogicalId, &Group)> {
        self.groups.iter()
    }

    /// Group for `logical_id`, if present
    pub fn group(&self, logical_id: &LogicalId) -> Option<&Group> {
        self.groups.get(logical_id)
    }

    /// Number of groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Total memberships across all groups
    pub fn subscriber_count(&self) -> usize {
        self.groups.iter().map(|(_, g)| g.len()).sum()
    }
}

/// Reverse-index entry for one subscriber
#[derive(Debug)]
struct Membership {
    handle: SubscriberHandle,
    channels: HashMap<String, LogicalId>,
}

/// What a `subscribe` call changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOutcome {
    /// The subscriber had no memberships before this call
    pub first_registration: bool,
    /// The subscriber was not already in the target group
    pub added: bool,
    /// Group the subscriber was moved out of in this channel
    pub moved_from: Option<LogicalId>,
}

/// The membership index
#[derive(Debug, Default)]
pub struct Registry {
    channels: HashMap<String, Channel>,
    members: BTreeMap<SubscriberId, Membership>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `handle` to `logical_id`'s group in `channel`
    ///
    /// Idempotent. Creates the channel and group on demand. If the
    /// subscriber already holds a different logical id in this channel it
    /// is unsubscribed from that group first.
    pub fn subscribe(
        &mut self,
        handle: &SubscriberHandle,
        channel: &str,
        logical_id: &LogicalId,
    ) -> SubscribeOutcome {
        let id = handle.id();
        let first_registration = !self.members.contains_key(&id);
        let previous = self.logical_id_of(id, channel).cloned();

        let mut moved_from = None;
        match previous {
            Some(prev) if &prev == logical_id => {
                if self.is_member(id, channel, logical_id) {
                    return SubscribeOutcome {
                        first_registration,
                        added: false,
                        moved_from: None,
                    };
                }
            }
            Some(prev) => {
                self.unsubscribe(id, channel, &prev);
                moved_from = Some(prev);
            }
            None => {}
        }

        self.channels
            .entry(channel.to_string())
            .or_insert_with(Channel::new)
            .groups
            .entry(logical_id.clone())
            .or_insert_with(Group::new)
            .members
            .entry(id)
            .or_insert_with(|| handle.clone());

        self.members
            .entry(id)
            .or_insert_with(|| Membership {
                handle: handle.clone(),
                channels: HashMap::new(),
            })
            .channels
            .insert(channel.to_string(), logical_id.clone());

        SubscribeOutcome {
            first_registration,
            added: true,
            moved_from,
        }
    }

    /// Remove subscriber `id` from `logical_id`'s group in `channel`
    ///
    /// Empty groups and channels are dropped immediately. Returns whether a
    /// membership was removed; absent memberships are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriberId, channel: &str, logical_id: &LogicalId) -> bool {
        let removed = self.detach(id, channel, logical_id);

        if let Some(membership) = self.members.get_mut(&id) {
            if membership.channels.get(channel) == Some(logical_id) {
                membership.channels.remove(channel);
            }
            if membership.channels.is_empty() {
                self.members.remove(&id);
            }
        }

        removed
    }

    fn detach(&mut self, id: SubscriberId, channel: &str, logical_id: &LogicalId) -> bool {
        let Some(entry) = self.channels.get_mut(channel) else {
            return false;
        };
        let Some(group) = entry.groups.get_mut(logical_id) else {
            return false;
        };

        let removed = group.members.remove(&id).is_some();
        if group.is_empty() {
            entry.groups.remove(logical_id);
        }
        if entry.groups.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// Snapshot of every `(channel, logical id)` pair `id` holds, by channel name
    pub fn memberships(&self, id: SubscriberId) -> Vec<(String, LogicalId)> {
        let mut pairs: Vec<(String, LogicalId)> = self
            .members
            .get(&id)
            .map(|m| {
                m.channels
                    .iter()
                    .map(|(c, l)| (c.clone(), l.clone()))
                    .collect()
            })
            .unwrap_or_default();
        pairs.sort();
        pairs
    }

    /// Drop anything left for `id` after per-channel cleanup
    ///
    /// Removes the reverse entry and strips `id` from every group of the
    /// named channels. Returns the number of residual entries removed.
    pub fn purge(&mut self, id: SubscriberId, channels: &[String]) -> usize {
        let mut residual = self
            .members
            .remove(&id)
            .map(|m| m.channels.len())
            .unwrap_or(0);

        for name in channels {
            let Some(entry) = self.channels.get_mut(name) else {
                continue;
            };

            let mut emptied = Vec::new();
            for (logical_id, group) in entry.groups.iter_mut() {
                if group.members.remove(&id).is_some() {
                    residual += 1;
                }
                if group.is_empty() {
                    emptied.push(logical_id.clone());
                }
            }
            for logical_id in emptied {
                entry.groups.remove(&logical_id);
            }
            if entry.groups.is_empty() {
                self.channels.remove(name);
            }
        }

        residual
    }

    /// Channel by name, if present
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Whether a channel with this name exists
    pub fn contains_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// All channels, unordered
    pub fn channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|(name, c)| (name.as_str(), c))
    }

    /// Whether `id` is in `logical_id`'s group in `channel`
    pub fn is_member(&self, id: SubscriberId, channel: &str, logical_id: &LogicalId) -> bool {
        self.channels
            .get(channel)
            .and_then(|c| c.group(logical_id))
            .map_or(false, |g| g.contains(id))
    }

    /// Logical id `id` holds in `channel`
    pub fn logical_id_of(&self, id: SubscriberId, channel: &str) -> Option<&LogicalId> {
        self.members.get(&id).and_then(|m| m.channels.get(channel))
    }

    /// Channels `id` belongs to, by name
    pub fn channels_of(&self, id: SubscriberId) -> Vec<String> {
        self.memberships(id).into_iter().map(|(c, _)| c).collect()
    }

    /// Handle of a known subscriber
    pub fn handle(&self, id: SubscriberId) -> Option<&SubscriberHandle> {
        self.members.get(&id).map(|m| &m.handle)
    }

    /// Whether `id` holds at least one membership
    pub fn is_known(&self, id: SubscriberId) -> bool {
        self.members.contains_key(&id)
    }

    /// Known subscribers in ascending id order
    pub fn known_subscribers(&self) -> impl Iterator<Item = &SubscriberHandle> {
        self.members.values().map(|m| &m.handle)
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of known subscribers
    pub fn subscriber_count(&self) -> usize {
        self.members.len()
    }

    /// Whether no channels and no subscribers remain
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.members.is_empty()
    }

    /// Check every structural invariant of both indexes
    pub fn is_consistent(&self) -> bool {
        for (name, channel) in &self.channels {
            if channel.groups.is_empty() {
                return false;
            }
            for (logical_id, group) in channel.groups.iter() {
                if group.is_empty() {
                    return false;
                }
                for handle in group.members() {
                    if self.logical_id_of(handle.id(), name) != Some(logical_id) {
                        return false;
                    }
                }
            }
        }

        self.members.iter().all(|(id, m)| {
            !m.channels.is_empty()
                && m.channels
                    .iter()
                    .all(|(channel, logical_id)| self.is_member(*id, channel, logical_id))
        })
    }
}

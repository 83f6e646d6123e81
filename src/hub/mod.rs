//! # Fan-out Hub
//!
//! In-process pub/sub registry for push delivery over long-lived
//! connections.
//!
//! ## Architecture
//!
//! - **Registry**: channel → logical group → subscriber index and its reverse
//! - **Dispatcher**: targeted sends and throttled broadcasts
//! - **Scheduler**: per-recipient delayed deliveries
//! - **Heartbeat**: single keepalive delegate election
//! - **Hub**: owns all of the above; one instance per isolated fan-out domain

pub mod dispatcher;
pub mod errors;
pub mod heartbeat;
#[allow(clippy::module_inception)]
pub mod hub;
pub mod message;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod subscriber;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use errors::{HubError, HubResult};
pub use heartbeat::{DelegateStatus, HeartbeatCoordinator, MonitorOutcome};
pub use hub::{Hub, RemovalReport, SharedHub};
pub use message::{LogicalId, Payload};
pub use registry::{Registry, SubscribeOutcome};
pub use scheduler::{Delivery, DeliveryScheduler};
pub use snapshot::{ChannelSnapshot, HubSnapshot};
pub use subscriber::{Liveness, OutboundReceiver, SubscriberHandle, SubscriberId};

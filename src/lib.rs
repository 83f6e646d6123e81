//! fanhub - in-process pub/sub fan-out for push delivery over long-lived
//! connections
//!
//! Subscribers join named channels under an application-defined logical
//! id. Messages go to specific logical groups or to a whole channel minus
//! one group. One subscriber at a time is elected to originate keepalive
//! probes.

pub mod cli;
pub mod command;
pub mod config;
pub mod hub;
pub mod transport;

pub use command::{apply, ApplyReport, Command, CommandError, CommandUnit};
pub use config::{ConfigError, ServerConfig};
pub use hub::{
    DispatchReport, Hub, HubError, HubResult, HubSnapshot, LogicalId, MonitorOutcome, Payload,
    SharedHub, SubscriberHandle, SubscriberId,
};

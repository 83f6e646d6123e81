//! # Hub Messages
//!
//! Logical ids, payloads and the outbound messages the hub originates.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Field injected into every broadcast payload
pub const CANAL_NAME: &str = "CANAL_NAME";

/// Field carrying a per-recipient delay increment in milliseconds
pub const THROTTELING: &str = "THROTTELING";

/// Field under which non-object push data is wrapped
pub const MESSAGES_DATA: &str = "MESSAGES_DATA";

/// Role of the synthetic notice broadcast when a member leaves
pub const MEMBER_DISCONNECTED: &str = "MEMBER_DISCONNECTED";

/// Code of the directive sent to a newly elected delegate
pub const DELEGATE_KEEP_ALIVE_MISSION: &str = "DELEGATE_KEEP_ALIVE_MISSION";

/// A push payload: always a JSON object so `CANAL_NAME` can be injected
pub type Payload = Map<String, Value>;

/// Application-defined identity of a group within a channel
///
/// Decodes from a JSON string or number; numbers are kept in their decimal
/// form so `42` and `"42"` name the same group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for LogicalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for LogicalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => LogicalId(s),
            Raw::Number(n) => LogicalId(n.to_string()),
        })
    }
}

/// Turn arbitrary push data into a payload object
///
/// Objects pass through; anything else is wrapped under `MESSAGES_DATA`.
pub fn payload_from_value(data: Value) -> Payload {
    match data {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert(MESSAGES_DATA.to_string(), other);
            map
        }
    }
}

/// Copy of `payload` carrying the channel name
///
/// The source payload is never mutated, so one payload can fan out to many
/// channels and each channel sees only its own name.
pub fn annotate(payload: &Payload, channel: &str) -> Payload {
    let mut annotated = payload.clone();
    annotated.insert(CANAL_NAME.to_string(), Value::String(channel.to_string()));
    annotated
}

/// Throttle increment carried inside a payload, if any
pub fn payload_throttle(payload: &Payload) -> Option<u64> {
    payload.get(THROTTELING).and_then(Value::as_u64)
}

/// Notice broadcast to a channel when one of its members disconnects
pub fn member_disconnected(logical_id: &LogicalId) -> Payload {
    let mut map = Map::new();
    map.insert(
        "MESSAGE_ROLE".to_string(),
        Value::String(MEMBER_DISCONNECTED.to_string()),
    );
    map.insert(
        "LOGICAL_ID".to_string(),
        Value::String(logical_id.as_str().to_string()),
    );
    map
}

/// Out-of-band directive naming a subscriber the keepalive delegate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateMission {
    #[serde(rename = "MESSAGE_CODE")]
    pub code: String,

    /// Probe interval the delegate should use, in milliseconds
    #[serde(rename = "INTERVAL")]
    pub interval_ms: u64,
}

impl DelegateMission {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            code: DELEGATE_KEEP_ALIVE_MISSION.to_string(),
            interval_ms,
        }
    }
}

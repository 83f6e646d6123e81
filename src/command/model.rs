//! # Command Model
//!
//! Typed inbound commands. Each wire object is tagged by `MESSAGE_ROLE`.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::errors::{CommandError, CommandResult};
use crate::hub::message::{payload_from_value, payload_throttle, LogicalId, Payload, THROTTELING};

/// One inbound command
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "MESSAGE_ROLE")]
pub enum Command {
    #[serde(rename = "SUBSCRIBE")]
    Subscribe(MembershipChange),

    #[serde(rename = "UNSUBSCRIBE")]
    Unsubscribe(MembershipChange),

    #[serde(rename = "PUSH_NOTIFICATION")]
    PushNotification(PushNotification),

    #[serde(rename = "HEARTBEAT_PONG")]
    HeartbeatPong(Pong),
}

impl Command {
    /// Wire name of the command's role
    pub fn role(&self) -> &'static str {
        match self {
            Command::Subscribe(_) => "SUBSCRIBE",
            Command::Unsubscribe(_) => "UNSUBSCRIBE",
            Command::PushNotification(_) => "PUSH_NOTIFICATION",
            Command::HeartbeatPong(_) => "HEARTBEAT_PONG",
        }
    }
}

/// Body of `SUBSCRIBE` / `UNSUBSCRIBE`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipChange {
    #[serde(rename = "CHANNEL_NAME", deserialize_with = "one_or_many")]
    pub channels: Vec<String>,

    #[serde(rename = "LOGICAL_ID")]
    pub logical_id: LogicalId,
}

/// Body of `HEARTBEAT_PONG`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Pong {
    #[serde(rename = "LOGICAL_ID", default)]
    pub logical_id: Option<LogicalId>,
}

/// Delivery mode of a push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryMethod {
    Broadcast,
    Private,
}

/// Who a push goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    /// Whole channel minus the sender's group
    Broadcast,
    /// Only the named groups
    Private(Vec<LogicalId>),
}

/// Body of `PUSH_NOTIFICATION`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPushNotification")]
pub struct PushNotification {
    pub channels: Vec<String>,
    /// Sender's logical id; the broadcast exclusion key
    pub sender: LogicalId,
    pub target: PushTarget,
    pub data: Payload,
    /// Explicit per-recipient delay increment
    pub throttling: Option<u64>,
}

impl PushNotification {
    /// Delay increment for a broadcast: explicit field, then payload, then 0
    pub fn throttle_ms(&self) -> u64 {
        self.throttling
            .or_else(|| payload_throttle(&self.data))
            .unwrap_or(0)
    }
}

#[derive(Deserialize)]
struct RawPushNotification {
    #[serde(rename = "CHANNEL_NAME", deserialize_with = "one_or_many")]
    channels: Vec<String>,

    #[serde(rename = "DEFFUSE_METHODE")]
    method: DeliveryMethod,

    #[serde(rename = "LOGICAL_ID")]
    sender: LogicalId,

    #[serde(rename = "MESSAGE_RECEIVER", default, deserialize_with = "opt_one_or_many")]
    receivers: Option<Vec<LogicalId>>,

    #[serde(rename = "MESSAGES_DATA", default = "empty_object")]
    data: Value,

    #[serde(rename = "THROTTELING", default)]
    throttling: Option<u64>,
}

impl TryFrom<RawPushNotification> for PushNotification {
    type Error = CommandError;

    fn try_from(raw: RawPushNotification) -> CommandResult<Self> {
        let target = match (raw.method, raw.receivers) {
            (DeliveryMethod::Broadcast, _) => PushTarget::Broadcast,
            (DeliveryMethod::Private, Some(receivers)) => PushTarget::Private(receivers),
            (DeliveryMethod::Private, None) => {
                return Err(CommandError::InvalidPush(
                    "PRIVATE delivery requires MESSAGE_RECEIVER".to_string(),
                ))
            }
        };

        let data = payload_from_value(raw.data);
        if let Some(value) = data.get(THROTTELING) {
            if value.as_u64().is_none() {
                return Err(CommandError::InvalidPush(format!(
                    "{} in MESSAGES_DATA must be a non-negative integer, got {}",
                    THROTTELING, value
                )));
            }
        }

        Ok(Self {
            channels: raw.channels,
            sender: raw.sender,
            target,
            data,
            throttling: raw.throttling,
        })
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

fn opt_one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    one_or_many(deserializer).map(Some)
}

/// An ordered batch of commands, applied front to back
#[derive(Debug, Clone, PartialEq)]
pub struct CommandUnit {
    commands: Vec<Command>,
}

impl CommandUnit {
    /// Decode a unit from a text frame
    ///
    /// Accepts an array of command objects or a single object. Fails as a
    /// whole if any element fails.
    pub fn decode(text: &str) -> CommandResult<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CommandError::MalformedJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> CommandResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            obj @ Value::Object(_) => vec![obj],
            _ => return Err(CommandError::NotAUnit),
        };

        let commands = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Command>(item).map_err(|e| CommandError::InvalidCommand {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect::<CommandResult<Vec<_>>>()?;

        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_subscribe() {
        let unit = CommandUnit::decode(
            r#"[{"MESSAGE_ROLE": "SUBSCRIBE", "CHANNEL_NAME": ["a", "b"], "LOGICAL_ID": 7}]"#,
        )
        .unwrap();

        assert_eq!(
            unit.commands(),
            &[Command::Subscribe(MembershipChange {
                channels: vec!["a".to_string(), "b".to_string()],
                logical_id: LogicalId::from("7"),
            })]
        );
    }

    #[test]
    fn test_single_object_and_single_channel() {
        let unit = CommandUnit::decode(
            r#"{"MESSAGE_ROLE": "UNSUBSCRIBE", "CHANNEL_NAME": "a", "LOGICAL_ID": "u1"}"#,
        )
        .unwrap();

        assert_eq!(unit.len(), 1);
        assert_eq!(unit.commands()[0].role(), "UNSUBSCRIBE");
    }

    #[test]
    fn test_decode_private_push() {
        let unit = CommandUnit::from_value(json!([{
            "MESSAGE_ROLE": "PUSH_NOTIFICATION",
            "CHANNEL_NAME": ["room"],
            "DEFFUSE_METHODE": "PRIVATE",
            "LOGICAL_ID": "u1",
            "MESSAGE_RECEIVER": "u2",
            "MESSAGES_DATA": {"msg": "x"}
        }]))
        .unwrap();

        let Command::PushNotification(push) = &unit.commands()[0] else {
            panic!("expected push");
        };
        assert_eq!(push.target, PushTarget::Private(vec![LogicalId::from("u2")]));
        assert_eq!(Value::Object(push.data.clone()), json!({"msg": "x"}));
        assert_eq!(push.throttle_ms(), 0);
    }

    #[test]
    fn test_throttle_from_field_or_payload() {
        let explicit = CommandUnit::from_value(json!({
            "MESSAGE_ROLE": "PUSH_NOTIFICATION",
            "CHANNEL_NAME": "room",
            "DEFFUSE_METHODE": "BROADCAST",
            "LOGICAL_ID": "u1",
            "MESSAGES_DATA": {"THROTTELING": 5},
            "THROTTELING": 20
        }))
        .unwrap();
        let inline = CommandUnit::from_value(json!({
            "MESSAGE_ROLE": "PUSH_NOTIFICATION",
            "CHANNEL_NAME": "room",
            "DEFFUSE_METHODE": "BROADCAST",
            "LOGICAL_ID": "u1",
            "MESSAGES_DATA": {"THROTTELING": 5}
        }))
        .unwrap();

        let throttle = |unit: &CommandUnit| match &unit.commands()[0] {
            Command::PushNotification(p) => p.throttle_ms(),
            _ => panic!("expected push"),
        };
        assert_eq!(throttle(&explicit), 20);
        assert_eq!(throttle(&inline), 5);
    }

    #[test]
    fn test_private_without_receiver_rejected() {
        let result = CommandUnit::from_value(json!([{
            "MESSAGE_ROLE": "PUSH_NOTIFICATION",
            "CHANNEL_NAME": ["room"],
            "DEFFUSE_METHODE": "PRIVATE",
            "LOGICAL_ID": "u1"
        }]));
        assert!(matches!(result, Err(CommandError::InvalidCommand { index: 0, .. })));
    }

    #[test]
    fn test_one_bad_command_rejects_unit() {
        let result = CommandUnit::from_value(json!([
            {"MESSAGE_ROLE": "SUBSCRIBE", "CHANNEL_NAME": ["a"], "LOGICAL_ID": "u1"},
            {"MESSAGE_ROLE": "EXPLODE"}
        ]));
        assert!(matches!(result, Err(CommandError::InvalidCommand { index: 1, .. })));
    }

    #[test]
    fn test_negative_throttle_rejected() {
        let result = CommandUnit::from_value(json!({
            "MESSAGE_ROLE": "PUSH_NOTIFICATION",
            "CHANNEL_NAME": "room",
            "DEFFUSE_METHODE": "BROADCAST",
            "LOGICAL_ID": "u1",
            "THROTTELING": -10
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_payload_throttle_rejects_unit() {
        for bad in [json!(-10), json!(2.5), json!("fast"), Value::Null] {
            let result = CommandUnit::from_value(json!([
                {"MESSAGE_ROLE": "SUBSCRIBE", "CHANNEL_NAME": "room", "LOGICAL_ID": "u1"},
                {
                    "MESSAGE_ROLE": "PUSH_NOTIFICATION",
                    "CHANNEL_NAME": "room",
                    "DEFFUSE_METHODE": "BROADCAST",
                    "LOGICAL_ID": "u1",
                    "MESSAGES_DATA": {"THROTTELING": bad}
                }
            ]));
            match result {
                Err(CommandError::InvalidCommand { index, reason }) => {
                    assert_eq!(index, 1);
                    assert!(reason.contains("THROTTELING"), "reason: {}", reason);
                }
                other => panic!("expected rejection, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_unit_json_rejected() {
        assert_eq!(CommandUnit::decode("42"), Err(CommandError::NotAUnit));
        assert!(matches!(
            CommandUnit::decode("{not json"),
            Err(CommandError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_pong_ignores_extra_fields() {
        let unit = CommandUnit::decode(r#"[{"MESSAGE_ROLE": "HEARTBEAT_PONG", "TS": 1}]"#).unwrap();
        assert_eq!(unit.commands(), &[Command::HeartbeatPong(Pong::default())]);
    }
}

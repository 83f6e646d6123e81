//! Dispatch Scenario Tests
//!
//! End-to-end delivery through a `Hub`: targeted sends, broadcast with
//! group exclusion, throttled fan-out and disconnect notices.

use std::time::Duration;

use serde_json::{json, Value};

use fanhub::hub::{Hub, LogicalId, OutboundReceiver, Payload, SubscriberHandle};

fn lid(s: &str) -> LogicalId {
    LogicalId::from(s)
}

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => panic!("payload must be an object"),
    }
}

/// Drain every queued frame as JSON
fn drain(rx: &mut OutboundReceiver) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).unwrap());
    }
    frames
}

/// Drain frames, dropping the keepalive mission if present
fn drain_data(rx: &mut OutboundReceiver) -> Vec<Value> {
    drain(rx)
        .into_iter()
        .filter(|f| f.get("MESSAGE_CODE").is_none())
        .collect()
}

struct Room {
    hub: Hub,
    a: (SubscriberHandle, OutboundReceiver),
    b: (SubscriberHandle, OutboundReceiver),
    c: (SubscriberHandle, OutboundReceiver),
}

/// room1: A and B under u1, C under u2
fn room1() -> Room {
    let mut hub = Hub::new();
    let a = hub.connect();
    let b = hub.connect();
    let c = hub.connect();
    hub.subscribe(&a.0, "room1", &lid("u1"));
    hub.subscribe(&b.0, "room1", &lid("u1"));
    hub.subscribe(&c.0, "room1", &lid("u2"));
    Room { hub, a, b, c }
}

// =============================================================================
// BROADCAST
// =============================================================================

#[test]
fn test_broadcast_excludes_sender_group() {
    let mut room = room1();

    let report = room
        .hub
        .broadcast("room1", &payload(json!({"x": 1})), Some(&lid("u1")), 0);

    assert_eq!(report.delivered, 1);
    assert!(drain_data(&mut room.a.1).is_empty());
    assert!(drain_data(&mut room.b.1).is_empty());
    assert_eq!(
        drain_data(&mut room.c.1),
        vec![json!({"x": 1, "CANAL_NAME": "room1"})]
    );
}

#[test]
fn test_broadcast_without_exclusion_reaches_everyone() {
    let mut room = room1();

    let report = room.hub.broadcast("room1", &payload(json!({"x": 2})), None, 0);

    assert_eq!(report.delivered, 3);
    for rx in [&mut room.a.1, &mut room.b.1, &mut room.c.1] {
        assert_eq!(drain_data(rx), vec![json!({"x": 2, "CANAL_NAME": "room1"})]);
    }
}

#[test]
fn test_broadcast_to_unknown_channel_is_noop() {
    let room = room1();
    let report = room.hub.broadcast("nowhere", &payload(json!({})), None, 0);
    assert_eq!(report.matched, 0);
    assert_eq!(report.delivered, 0);
}

#[test]
fn test_broadcast_skips_closed_recipient() {
    let mut room = room1();
    room.c.0.close();

    let report = room.hub.broadcast("room1", &payload(json!({"x": 3})), None, 0);

    assert_eq!(report.delivered, 2);
    assert_eq!(report.skipped_closed, 1);
    assert!(drain_data(&mut room.c.1).is_empty());
}

// =============================================================================
// TARGETED
// =============================================================================

#[test]
fn test_targeted_reaches_named_group_only() {
    let mut room = room1();

    let report = room
        .hub
        .send_targeted("room1", &[lid("u2")], &payload(json!({"y": 1})));

    assert_eq!(report.delivered, 1);
    assert_eq!(drain_data(&mut room.c.1), vec![json!({"y": 1})]);
    assert!(drain_data(&mut room.a.1).is_empty());
    assert!(drain_data(&mut room.b.1).is_empty());
}

#[test]
fn test_targeted_reaches_every_member_of_group() {
    let mut room = room1();

    let report = room
        .hub
        .send_targeted("room1", &[lid("u1"), lid("ghost")], &payload(json!({"y": 2})));

    assert_eq!(report.delivered, 2);
    assert_eq!(drain_data(&mut room.a.1).len(), 1);
    assert_eq!(drain_data(&mut room.b.1).len(), 1);
    assert!(drain_data(&mut room.c.1).is_empty());
}

// =============================================================================
// THROTTLED BROADCAST
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_throttled_broadcast_spaces_deliveries() {
    let mut room = room1();

    let report = room
        .hub
        .broadcast("room1", &payload(json!({"z": 1})), None, 100);

    assert_eq!(report.delivered, 1);
    assert_eq!(report.deferred, 2);

    let total = |room: &mut Room| {
        drain_data(&mut room.a.1).len() + drain_data(&mut room.b.1).len() + drain_data(&mut room.c.1).len()
    };
    assert_eq!(total(&mut room), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(total(&mut room), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(total(&mut room), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deferred_delivery_dropped_if_recipient_closes() {
    let mut room = room1();

    room.hub.broadcast("room1", &payload(json!({"z": 2})), Some(&lid("u2")), 50);
    room.b.0.close();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(drain_data(&mut room.a.1).len(), 1);
    assert!(drain_data(&mut room.b.1).is_empty());
}

// =============================================================================
// DISCONNECT NOTICES
// =============================================================================

#[test]
fn test_disconnect_notifies_other_groups_only() {
    let mut room = room1();

    let report = room.hub.remove_subscriber(room.c.0.id());

    assert_eq!(report.notices.delivered, 2);
    let expected = json!({
        "MESSAGE_ROLE": "MEMBER_DISCONNECTED",
        "LOGICAL_ID": "u2",
        "CANAL_NAME": "room1"
    });
    assert_eq!(drain_data(&mut room.a.1), vec![expected.clone()]);
    assert_eq!(drain_data(&mut room.b.1), vec![expected]);
}

#[test]
fn test_disconnect_does_not_notify_own_group() {
    let mut room = room1();

    room.hub.remove_subscriber(room.a.0.id());

    assert!(drain_data(&mut room.b.1).is_empty());
    assert_eq!(drain_data(&mut room.c.1).len(), 1);
}

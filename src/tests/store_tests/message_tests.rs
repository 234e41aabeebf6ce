// Message Tests - Testing Message wire format and delivery status

use crate::store::{DeliveryStatus, Message, Sender};
use chrono::{TimeZone, Utc};

#[test]
fn test_message_deserializes_rfc3339() {
    let json = r#"{"sender":"user","content":"hello","timestamp":"2024-03-01T10:15:30.250Z"}"#;
    let msg: Message = serde_json::from_str(json).expect("Failed to parse message");

    assert_eq!(msg.sender, Sender::Customer);
    assert_eq!(msg.content, "hello");
    assert_eq!(msg.timestamp.timestamp_millis(), 1_709_288_130_250);
    assert_eq!(msg.status, DeliveryStatus::Confirmed);
    assert!(msg.local_id.is_none());
}

#[test]
fn test_message_deserializes_epoch_millis() {
    let json = r#"{"sender":"support","content":"hi","timestamp":1709288130250}"#;
    let msg: Message = serde_json::from_str(json).unwrap();

    assert_eq!(msg.sender, Sender::Operator);
    assert_eq!(msg.timestamp.timestamp_millis(), 1_709_288_130_250);
}

#[test]
fn test_sender_aliases() {
    for (raw, expected) in [
        ("customer", Sender::Customer),
        ("client", Sender::Customer),
        ("operator", Sender::Operator),
        ("admin", Sender::Operator),
    ] {
        let json = format!(r#"{{"sender":"{}","content":"x","timestamp":0}}"#, raw);
        let msg: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg.sender, expected, "Alias {} should map to {:?}", raw, expected);
    }
}

#[test]
fn test_invalid_timestamp_rejected() {
    let json = r#"{"sender":"user","content":"x","timestamp":"yesterday"}"#;
    assert!(serde_json::from_str::<Message>(json).is_err());
}

#[test]
fn test_message_serializes_wire_fields_only() {
    let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let msg = Message::outgoing("hi", ts);
    let value = serde_json::to_value(&msg).unwrap();

    assert_eq!(value["sender"], "support");
    assert_eq!(value["content"], "hi");
    assert_eq!(value["timestamp"], "2024-01-02T03:04:05Z");
    assert!(value.get("local_id").is_none());
    assert!(value.get("status").is_none());
}

#[test]
fn test_outgoing_message_is_pending() {
    let msg = Message::outgoing("hello", Utc::now());

    assert_eq!(msg.sender, Sender::Operator);
    assert_eq!(msg.status, DeliveryStatus::Pending);
    assert!(msg.local_id.is_some());
    assert!(msg.is_unconfirmed());
}

#[test]
fn test_outgoing_messages_have_unique_local_ids() {
    let ts = Utc::now();
    let a = Message::outgoing("same", ts);
    let b = Message::outgoing("same", ts);

    assert_ne!(a.local_id, b.local_id);
}

#[test]
fn test_same_line_ignores_local_fields() {
    let ts = Utc.timestamp_millis_opt(1_000_123).unwrap();
    let local = Message::outgoing("hi", ts);
    let remote = Message::new(Sender::Operator, "hi", ts);

    assert!(local.same_line(&remote));
    assert!(!local.same_line(&Message::new(Sender::Customer, "hi", ts)));
    assert!(!local.same_line(&Message::new(Sender::Operator, "hi!", ts)));
    assert!(!local.same_line(&Message::new(
        Sender::Operator,
        "hi",
        Utc.timestamp_millis_opt(1_000_124).unwrap()
    )));
}

#[test]
fn test_delivery_status_transitions() {
    let mut msg = Message::outgoing("x", Utc::now());
    assert_eq!(msg.status_indicator(), "↻");

    msg.mark_failed();
    assert_eq!(msg.status, DeliveryStatus::Failed);
    assert!(msg.is_unconfirmed());
    assert_eq!(msg.status_indicator(), "✗");

    msg.mark_pending();
    assert_eq!(msg.status, DeliveryStatus::Pending);

    msg.mark_sent();
    assert_eq!(msg.status, DeliveryStatus::Sent);
    assert!(!msg.is_unconfirmed());
    assert_eq!(msg.status_indicator(), "✓");

    msg.mark_confirmed();
    assert_eq!(msg.status_indicator(), "");
}

#[test]
fn test_sender_labels() {
    assert_eq!(Sender::Customer.label(), "Customer");
    assert_eq!(Sender::Operator.label(), "You");
}

//! Chat message structures and delivery status tracking

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sender {
    /// The customer on the other end of the conversation
    #[serde(rename = "user", alias = "customer", alias = "client")]
    Customer,
    /// The support operator using this dashboard
    #[serde(rename = "support", alias = "operator", alias = "admin")]
    Operator,
}

impl Sender {
    /// Short label used when rendering a conversation
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Operator => "You",
        }
    }
}

/// Local delivery status of a message
///
/// Everything received from the backend is `Confirmed`. Operator messages
/// start out `Pending` and only become `Confirmed` once a snapshot or a
/// pushed echo contains them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    /// Known to the backend
    #[default]
    Confirmed,
    /// Shown optimistically, append request in flight
    Pending,
    /// Append acknowledged, waiting for the next snapshot
    Sent,
    /// Append request failed; may be retried
    Failed,
}

/// A single chat line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub sender: Sender,
    /// Text content
    pub content: String,
    /// Creation time
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Identifier of an optimistic local message
    #[serde(skip)]
    pub local_id: Option<Uuid>,
    /// Local delivery status
    #[serde(skip)]
    pub status: DeliveryStatus,
}

impl Message {
    /// Create a message as received from the backend
    pub fn new(sender: Sender, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            content: content.into(),
            timestamp,
            local_id: None,
            status: DeliveryStatus::Confirmed,
        }
    }

    /// Create an operator message that has not been confirmed yet
    pub fn outgoing(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: Sender::Operator,
            content: content.into(),
            timestamp,
            local_id: Some(Uuid::new_v4()),
            status: DeliveryStatus::Pending,
        }
    }

    /// Whether both messages describe the same chat line
    ///
    /// Identity is sender, content and timestamp at millisecond precision;
    /// local bookkeeping fields are ignored.
    pub fn same_line(&self, other: &Message) -> bool {
        self.sender == other.sender
            && self.content == other.content
            && self.timestamp.timestamp_millis() == other.timestamp.timestamp_millis()
    }

    /// Whether the backend has not confirmed this message yet
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self.status, DeliveryStatus::Pending | DeliveryStatus::Failed)
    }

    /// Mark the append request as acknowledged
    pub fn mark_sent(&mut self) {
        self.status = DeliveryStatus::Sent;
    }

    /// Mark the append request as failed
    pub fn mark_failed(&mut self) {
        self.status = DeliveryStatus::Failed;
    }

    /// Mark the message as being retried
    pub fn mark_pending(&mut self) {
        self.status = DeliveryStatus::Pending;
    }

    /// Mark the message as known to the backend
    pub fn mark_confirmed(&mut self) {
        self.status = DeliveryStatus::Confirmed;
    }

    /// Get human-readable delivery status indicator
    pub fn status_indicator(&self) -> &str {
        match self.status {
            DeliveryStatus::Confirmed => "",
            DeliveryStatus::Pending => "↻",
            DeliveryStatus::Sent => "✓",
            DeliveryStatus::Failed => "✗",
        }
    }
}

/// Accept RFC 3339 strings as well as Unix epoch milliseconds
fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Millis(i64),
    }

    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom),
        RawTimestamp::Millis(millis) => Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", millis))),
    }
}

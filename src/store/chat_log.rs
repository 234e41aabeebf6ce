//! Customer conversation management

use crate::store::message::Message;
use serde::{Deserialize, Serialize};

/// One customer conversation and its message history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    /// Backend identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Identifier of the customer's client, used by appends and pushes
    #[serde(rename = "clientId")]
    pub client_id: String,
    /// Display title
    #[serde(default)]
    pub title: Option<String>,
    /// Messages in arrival order
    #[serde(rename = "userLogs", default)]
    pub messages: Vec<Message>,
    /// New content arrived while this chat was not selected
    #[serde(skip)]
    pub unread: bool,
}

impl ChatLog {
    /// Create an empty chat log
    pub fn new(id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            title: None,
            messages: Vec::new(),
            unread: false,
        }
    }

    /// Title to show in lists, falling back to the client id
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.client_id,
        }
    }

    /// Append a message to this chat
    pub fn append_message(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Find a message describing the same chat line
    pub fn find_line_mut(&mut self, msg: &Message) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.same_line(msg))
    }

    /// Whether a message describing the same chat line is present
    pub fn contains_line(&self, msg: &Message) -> bool {
        self.messages.iter().any(|m| m.same_line(msg))
    }

    /// Find an optimistic message by its local id
    pub fn find_local_mut(&mut self, local_id: uuid::Uuid) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.local_id == Some(local_id))
    }

    /// Most recent message, if any
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Mark chat as having unread messages
    pub fn mark_unread(&mut self) {
        self.unread = true;
    }

    /// Mark chat as read
    pub fn mark_read(&mut self) {
        self.unread = false;
    }

    /// Number of messages whose append failed
    pub fn failed_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.status == crate::store::DeliveryStatus::Failed)
            .count()
    }
}

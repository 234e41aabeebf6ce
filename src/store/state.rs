//! Session state for the dashboard
//!
//! `ChatStore` is the only writer of the chat collection. Fetch results,
//! pushed channel events and operator intents all arrive here and are merged
//! under one rule: a snapshot replaces what is known, pushes and optimistic
//! sends are merged additively until the next snapshot, and no chat line is
//! ever shown twice.

use crate::channel::ConnectionState;
use crate::store::chat_log::ChatLog;
use crate::store::message::{DeliveryStatus, Message};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An operator message that still has to be handed to the transport
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Client id of the conversation to append to
    pub client_id: String,
    /// Local id of the optimistic copy shown in the store
    pub local_id: Uuid,
    /// Message to append
    pub message: Message,
}

/// In-memory state of one operator session
#[derive(Debug, Default)]
pub struct ChatStore {
    logs: Vec<ChatLog>,
    selected: Option<String>,
    connection: ConnectionState,
    last_error: Option<String>,
}

impl ChatStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All chat logs, in backend order
    pub fn logs(&self) -> &[ChatLog] {
        &self.logs
    }

    /// Id of the active chat
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The active chat
    pub fn selected_chat(&self) -> Option<&ChatLog> {
        let id = self.selected.as_deref()?;
        self.logs.iter().find(|log| log.id == id)
    }

    /// Look up a chat by id
    pub fn chat(&self, id: &str) -> Option<&ChatLog> {
        self.logs.iter().find(|log| log.id == id)
    }

    /// Number of chats with unread messages
    pub fn unread_count(&self) -> usize {
        self.logs.iter().filter(|log| log.unread).count()
    }

    /// Last connectivity state reported by the live channel
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Most recent fetch or send failure, if not cleared since
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace the collection with an authoritative snapshot
    ///
    /// The previous selection survives when its id is still present,
    /// otherwise the first chat (if any) becomes active. Unread flags and
    /// unconfirmed optimistic messages are local state and are carried over.
    pub fn apply_snapshot(&mut self, mut logs: Vec<ChatLog>) {
        let mut previous: HashMap<String, ChatLog> = std::mem::take(&mut self.logs)
            .into_iter()
            .map(|log| (log.id.clone(), log))
            .collect();

        for log in &mut logs {
            let Some(old) = previous.remove(&log.id) else {
                continue;
            };
            log.unread = old.unread;

            for msg in old.messages.into_iter().filter(Message::is_unconfirmed) {
                if log.contains_line(&msg) {
                    debug!("Optimistic message in chat {} confirmed by snapshot", log.id);
                } else {
                    log.append_message(msg);
                }
            }
        }

        let dropped: usize = previous.values().map(|log| log.messages.iter().filter(|m| m.is_unconfirmed()).count()).sum();
        if dropped > 0 {
            warn!("Snapshot removed {} chats holding {} unconfirmed messages", previous.len(), dropped);
        }

        self.logs = logs;

        let reselect = self
            .selected
            .take()
            .filter(|id| self.logs.iter().any(|log| &log.id == id))
            .or_else(|| self.logs.first().map(|log| log.id.clone()));

        if let Some(id) = reselect {
            self.select_chat(&id);
        }

        self.last_error = None;
        info!("Applied snapshot with {} chats", self.logs.len());
    }

    /// Merge a message pushed by the live channel
    ///
    /// Returns `false` when no chat has the given client id, in which case
    /// nothing changes and the caller should fetch a fresh snapshot.
    pub fn apply_pushed_message(&mut self, client_id: &str, message: Message) -> bool {
        let selected = self.selected.clone();
        let Some(log) = self.logs.iter_mut().find(|log| log.client_id == client_id) else {
            debug!("Pushed message for unknown client {}", client_id);
            return false;
        };

        if let Some(existing) = log.find_line_mut(&message) {
            debug!("Ignoring duplicate pushed message for client {}", client_id);
            existing.mark_confirmed();
            return true;
        }

        log.append_message(message);
        if selected.as_deref() != Some(log.id.as_str()) {
            log.mark_unread();
        }
        true
    }

    /// Make a chat the active selection and mark it read
    ///
    /// Returns `false` when no chat has the given id.
    pub fn select_chat(&mut self, id: &str) -> bool {
        match self.logs.iter_mut().find(|log| log.id == id) {
            Some(log) => {
                log.mark_read();
                self.selected = Some(id.to_string());
                true
            }
            None => false,
        }
    }

    /// Append an operator message optimistically to the active chat
    ///
    /// Nothing changes when no chat is selected or the trimmed text is empty.
    pub fn send_message(&mut self, text: &str, now: DateTime<Utc>) -> Result<OutboundMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Message is empty".to_string()));
        }

        let id = self
            .selected
            .clone()
            .ok_or_else(|| Error::Validation("No chat selected".to_string()))?;
        let log = self
            .logs
            .iter_mut()
            .find(|log| log.id == id)
            .ok_or_else(|| Error::Validation(format!("Selected chat {} is gone", id)))?;

        let message = Message::outgoing(text, now);
        let local_id = message
            .local_id
            .ok_or_else(|| Error::Validation("Outgoing message without local id".to_string()))?;
        log.append_message(message.clone());

        Ok(OutboundMessage {
            client_id: log.client_id.clone(),
            local_id,
            message,
        })
    }

    /// Record that the backend accepted an optimistic message
    pub fn confirm_send(&mut self, local_id: Uuid) {
        match self.find_local_mut(local_id) {
            Some(msg) => msg.mark_sent(),
            None => debug!("Acknowledged message {} no longer shown", local_id),
        }
    }

    /// Record that an optimistic message could not be appended
    ///
    /// The message stays visible, marked failed, and the error is surfaced.
    /// A message whose push echo already arrived was delivered, so it stays
    /// confirmed and nothing is reported.
    pub fn fail_send(&mut self, local_id: Uuid, error: &Error) {
        if let Some(msg) = self.find_local_mut(local_id) {
            if msg.status == DeliveryStatus::Confirmed {
                debug!("Ignoring send failure for confirmed message {}: {}", local_id, error);
                return;
            }
            msg.mark_failed();
        }
        self.report_error(format!("Send failed: {}", error));
    }

    /// Put every failed message of the active chat back in flight
    pub fn retry_failed(&mut self) -> Vec<OutboundMessage> {
        let Some(id) = self.selected.clone() else {
            return Vec::new();
        };
        let Some(log) = self.logs.iter_mut().find(|log| log.id == id) else {
            return Vec::new();
        };

        let client_id = log.client_id.clone();
        let mut retries = Vec::new();
        for msg in log
            .messages
            .iter_mut()
            .filter(|m| m.status == DeliveryStatus::Failed)
        {
            msg.mark_pending();
            if let Some(local_id) = msg.local_id {
                retries.push(OutboundMessage {
                    client_id: client_id.clone(),
                    local_id,
                    message: msg.clone(),
                });
            }
        }
        retries
    }

    /// Surface a failure without touching the loaded chats
    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.last_error = Some(message);
    }

    /// Record the connectivity state reported by the live channel
    pub fn observe_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    fn find_local_mut(&mut self, local_id: Uuid) -> Option<&mut Message> {
        self.logs
            .iter_mut()
            .find_map(|log| log.find_local_mut(local_id))
    }
}

//! Chat state module
//!
//! This module holds everything the dashboard knows about conversations:
//! - `message` - Chat lines, senders and local delivery status
//! - `chat_log` - One customer conversation
//! - `state` - The session store that reconciles snapshots, pushes and sends

pub mod chat_log;
pub mod message;
pub mod state;

// Re-export commonly used types
pub use chat_log::ChatLog;
pub use message::{DeliveryStatus, Message, Sender};
pub use state::{ChatStore, OutboundMessage};

//! UI helper functions

use crate::channel::ConnectionState;
use chrono::{DateTime, Local, Utc};

/// Format a message timestamp in local time
///
/// Messages from today only show the time of day.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    let local = timestamp.with_timezone(&Local);
    if local.date_naive() == Local::now().date_naive() {
        local.format("%H:%M:%S").to_string()
    } else {
        local.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Online/offline label for the connectivity indicator
pub fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connected => "● Online",
        ConnectionState::Connecting => "◌ Connecting",
        ConnectionState::Disconnected => "○ Offline",
    }
}

/// Shorten `text` to `max` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

//! Chatdesk - a support operator's dashboard for customer chat logs
//!
//! This library provides the pieces behind the `chatdesk-tui` binary:
//! an authenticated client for the chat-log API, a self-healing live
//! channel for pushed messages, and the store that reconciles both into
//! the state the dashboard renders.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod crypto;
pub mod store;
pub mod transport;
pub mod tui;

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Result type alias for Chatdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Chatdesk operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network, HTTP status or explicit error payload from the chat-log API
    #[error("Transport error: {0}")]
    Transport(String),

    /// Live channel failure (connect failure, malformed frame)
    #[error("Channel error: {0}")]
    Channel(String),

    /// Rejected operator input; never reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// Signing or payload encryption error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Initialize logging
///
/// Filtering follows `RUST_LOG` (default `info`). When `log_file` is given,
/// output is appended to that file instead of stdout so that a running TUI
/// is not overwritten by log lines.
pub fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests;

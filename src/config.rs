//! Application settings and configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding `api_base_url`
pub const ENV_API_URL: &str = "CHATDESK_API_URL";
/// Environment variable overriding `live_channel_url`
pub const ENV_WS_URL: &str = "CHATDESK_WS_URL";
/// Environment variable overriding `shared_secret`
pub const ENV_SECRET: &str = "CHATDESK_SECRET";
/// Environment variable naming the settings file
pub const CONFIG_PATH_ENV: &str = "CHATDESK_CONFIG";
/// Settings file used when `CHATDESK_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "chatdesk.json";

/// Application settings
///
/// Stored as JSON. Missing fields take their default value, so a settings
/// file only needs to mention what differs from the defaults.
///
/// # Example
/// ```rust,no_run
/// use chatdesk::config::Settings;
///
/// let mut settings = Settings::load("chatdesk.json").expect("Failed to load");
/// settings.apply_env_overrides();
/// settings.validate().expect("Invalid settings");
/// println!("Listing chats from {}", settings.chat_logs_url());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the chat-log API
    pub api_base_url: String,
    /// Path of the listing endpoint
    pub chat_logs_path: String,
    /// Path of the append endpoint
    pub append_path: String,
    /// WebSocket URL of the live channel
    pub live_channel_url: String,
    /// Shared secret used for request signatures
    pub shared_secret: String,
    /// Encrypt request bodies with the shared secret
    pub encrypt_payloads: bool,
    /// Delay before reconnecting after an unexpected close, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Upper bound for one connect attempt, in milliseconds
    pub connect_timeout_ms: u64,
    /// Upper bound for one API request, in milliseconds
    pub request_timeout_ms: u64,
    /// Number of chats per list page
    pub page_size: usize,
    /// File the TUI writes its log to
    pub log_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".to_string(),
            chat_logs_path: "/api/chatlogs".to_string(),
            append_path: "/api/chatlogs/append".to_string(),
            live_channel_url: "ws://127.0.0.1:3000/ws".to_string(),
            shared_secret: String::new(),
            encrypt_payloads: false,
            reconnect_delay_ms: 2000,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 15_000,
            page_size: 5,
            log_file: "chatdesk.log".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// Returns the defaults if the file doesn't exist or is empty.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save settings to a JSON file, creating parent directories
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create settings directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)?;

        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = non_empty(ENV_WS_URL) {
            self.live_channel_url = url;
        }
        if let Some(secret) = non_empty(ENV_SECRET) {
            self.shared_secret = secret;
        }
    }

    /// Reject settings the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }
        if self.live_channel_url.trim().is_empty() {
            return Err(Error::Config("live_channel_url must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(Error::Config("reconnect_delay_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Full URL of the listing endpoint
    pub fn chat_logs_url(&self) -> String {
        join_url(&self.api_base_url, &self.chat_logs_path)
    }

    /// Full URL of the append endpoint
    pub fn append_url(&self) -> String {
        join_url(&self.api_base_url, &self.append_path)
    }

    /// Reconnect delay as a duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

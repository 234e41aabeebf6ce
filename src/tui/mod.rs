//! TUI (Terminal User Interface) module
//!
//! This module contains all TUI logic separated from the binary for better testability.

pub mod types;
pub mod screens;
pub mod app;
pub mod ui;

// Re-export main types for convenience
pub use types::Focus;
pub use screens::{ChatListScreen, ChatViewScreen};
pub use app::{App, AppEvent};

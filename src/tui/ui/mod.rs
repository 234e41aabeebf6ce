//! UI rendering module - pane-specific rendering functions
//!
//! The dashboard is a single screen: a status bar, the paginated chat list
//! on the left, the active conversation on the right and key help below.

mod chat_list;
mod chat_view;
mod helpers;
mod status;

use crate::tui::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

// Re-export render functions
pub use chat_list::render_chat_list;
pub use chat_view::render_chat_view;
pub use status::{render_help, render_status_bar};

// Re-export helper functions
pub use helpers::{connection_label, format_timestamp, truncate};

/// Main UI rendering function
pub fn ui(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(8),    // Panes
            Constraint::Length(3), // Help
        ])
        .split(f.size());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);

    render_status_bar(f, app, rows[0]);
    render_chat_list(f, app, panes[0]);
    render_chat_view(f, app, panes[1]);
    render_help(f, app, rows[2]);
}

//! Status bar and key help rendering

use crate::tui::app::App;
use crate::tui::ui::helpers::connection_label;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders connectivity, unread count and the latest error notice
pub fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let state = app.connection_state();
    let state_color = if state.is_online() { Color::Green } else { Color::Red };

    let mut spans = vec![
        Span::styled(
            "Chatdesk ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(connection_label(state), Style::default().fg(state_color)),
        Span::raw(format!("  | {} unread", app.store.unread_count())),
    ];

    if let Some(error) = app.store.last_error() {
        spans.push(Span::raw("  | "));
        spans.push(Span::styled(error.to_string(), Style::default().fg(Color::Red)));
    }

    let status = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

/// Renders key help for the focused pane
pub fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help = Paragraph::new(app.focus.help())
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, area);
}

//! Conversation pane rendering

use crate::store::{DeliveryStatus, Sender};
use crate::tui::app::App;
use crate::tui::types::Focus;
use crate::tui::ui::helpers::format_timestamp;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Renders the active conversation and the compose box
pub fn render_chat_view(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Message history
            Constraint::Length(3), // Input box
        ])
        .split(area);

    let Some(chat) = app.store.selected_chat() else {
        let empty_msg = Paragraph::new("Select a chat from the list.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Conversation"));
        f.render_widget(empty_msg, area);
        return;
    };

    let title = format!("{} [{}]", chat.display_title(), chat.client_id);

    if chat.messages.is_empty() {
        let empty_msg = Paragraph::new("No messages yet.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty_msg, chunks[0]);
    } else {
        // Newest messages sit at the bottom; scrolling moves the window up
        let total_messages = chat.messages.len();
        let visible_height = chunks[0].height.saturating_sub(2) as usize;
        let end_idx = total_messages.saturating_sub(app.chat_view_screen.scroll_offset);
        let start_idx = end_idx.saturating_sub(visible_height);

        let message_lines: Vec<Line> = chat.messages[start_idx..end_idx]
            .iter()
            .map(|msg| {
                let sender_color = match msg.sender {
                    Sender::Operator => Color::Green,
                    Sender::Customer => Color::Blue,
                };
                let content_style = match msg.status {
                    DeliveryStatus::Failed => Style::default().fg(Color::Red),
                    DeliveryStatus::Pending => Style::default().fg(Color::DarkGray),
                    _ => Style::default().fg(Color::White),
                };

                Line::from(vec![
                    Span::styled(
                        format!("[{}] ", format_timestamp(msg.timestamp)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(
                        format!("{}: ", msg.sender.label()),
                        Style::default().fg(sender_color).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(msg.content.clone(), content_style),
                    Span::styled(
                        format!(" {}", msg.status_indicator()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])
            })
            .collect();

        let messages_widget = Paragraph::new(message_lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("{} ({}/{})", title, end_idx, total_messages)),
            );
        f.render_widget(messages_widget, chunks[0]);
    }

    let input_title = if !app.connection_state().is_online() {
        "Offline - sending disabled"
    } else if app.is_sending() {
        "Sending..."
    } else {
        "Type your reply"
    };
    let border_style = if app.focus == Focus::Compose {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let input_style = if app.can_send() || app.chat_view_screen.input.is_empty() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input_widget = Paragraph::new(app.chat_view_screen.input.as_str())
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(input_title),
        );
    f.render_widget(input_widget, chunks[1]);
}

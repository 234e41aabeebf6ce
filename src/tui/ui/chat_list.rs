//! Chat list pane rendering

use crate::tui::app::App;
use crate::tui::screens::paginate;
use crate::tui::types::Focus;
use crate::tui::ui::helpers::truncate;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Renders the paginated chat list
pub fn render_chat_list(f: &mut Frame, app: &App, area: Rect) {
    let screen = &app.chat_list_screen;
    let logs = app.store.logs();
    let total_pages = screen.total_pages(logs.len());

    let border_style = if app.focus == Focus::ChatList {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(
            "Chats ({}) - page {}/{}",
            logs.len(),
            screen.page,
            total_pages
        ));

    if logs.is_empty() {
        let empty_msg = Paragraph::new("No chats yet. Press r to refresh.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty_msg, area);
        return;
    }

    let selected_id = app.store.selected_id();
    let first = screen.visible_range(logs.len()).start;
    let title_width = area.width.saturating_sub(16) as usize;

    let chat_items: Vec<ListItem> = paginate(logs, screen.page, screen.page_size)
        .iter()
        .zip(first..)
        .map(|(log, index)| {
            let is_active = selected_id == Some(log.id.as_str());

            // Unread wins over failed sends; the active chat is never unread
            let (style, indicator) = if log.unread {
                (Style::default().fg(Color::Green).add_modifier(Modifier::BOLD), "● ")
            } else if log.failed_count() > 0 {
                (Style::default().fg(Color::Red), "✗ ")
            } else if is_active {
                (Style::default().fg(Color::Cyan), "▸ ")
            } else {
                (Style::default().fg(Color::Gray), "○ ")
            };

            let cursor = if index == screen.cursor {
                Span::styled("→ ", Style::default().fg(Color::Cyan))
            } else {
                Span::raw("  ")
            };

            ListItem::new(Line::from(vec![
                cursor,
                Span::styled(indicator, style),
                Span::styled(
                    format!(
                        "{} ({} msgs)",
                        truncate(log.display_title(), title_width),
                        log.messages.len()
                    ),
                    style,
                ),
            ]))
        })
        .collect();

    f.render_widget(List::new(chat_items).block(block), area);
}

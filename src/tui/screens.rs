//! Pane state for the dashboard

use std::ops::Range;

/// Number of pages needed for `count` items, never less than one
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size).max(1)
}

/// Index range of the 1-based `page`, clamped to the item count
pub fn page_range(count: usize, page: usize, page_size: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(page_size).min(count);
    let end = start.saturating_add(page_size).min(count);
    start..end
}

/// Items shown on the 1-based `page`
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    &items[page_range(items.len(), page, page_size)]
}

/// Chat list pane state
///
/// The cursor is an index into the full chat collection; the page always
/// follows the cursor.
#[derive(Debug)]
pub struct ChatListScreen {
    /// Highlighted chat index
    pub cursor: usize,
    /// Current 1-based page
    pub page: usize,
    /// Chats per page
    pub page_size: usize,
}

impl ChatListScreen {
    /// Create new chat list pane
    pub fn new(page_size: usize) -> Self {
        Self {
            cursor: 0,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Total number of pages for `chat_count` chats
    pub fn total_pages(&self, chat_count: usize) -> usize {
        total_pages(chat_count, self.page_size)
    }

    /// Index range shown on the current page
    pub fn visible_range(&self, chat_count: usize) -> Range<usize> {
        page_range(chat_count, self.page, self.page_size)
    }

    /// Move to next chat, wrapping around
    pub fn next(&mut self, chat_count: usize) {
        if chat_count > 0 {
            self.cursor = (self.cursor + 1) % chat_count;
            self.follow_cursor();
        }
    }

    /// Move to previous chat, wrapping around
    pub fn previous(&mut self, chat_count: usize) {
        if chat_count > 0 {
            if self.cursor > 0 {
                self.cursor -= 1;
            } else {
                self.cursor = chat_count - 1;
            }
            self.follow_cursor();
        }
    }

    /// Show the next page, if any
    pub fn next_page(&mut self, chat_count: usize) {
        if self.page < self.total_pages(chat_count) {
            self.page += 1;
            self.cursor = self.visible_range(chat_count).start;
        }
    }

    /// Show the previous page, if any
    pub fn previous_page(&mut self, chat_count: usize) {
        if self.page > 1 {
            self.page -= 1;
            self.cursor = self.visible_range(chat_count).start;
        }
    }

    /// Keep cursor and page valid after the collection changed
    pub fn clamp(&mut self, chat_count: usize) {
        if chat_count == 0 {
            self.cursor = 0;
            self.page = 1;
            return;
        }
        self.cursor = self.cursor.min(chat_count - 1);
        self.follow_cursor();
    }

    /// Put the cursor on a given chat index
    pub fn focus_index(&mut self, index: usize, chat_count: usize) {
        if index < chat_count {
            self.cursor = index;
            self.follow_cursor();
        }
    }

    fn follow_cursor(&mut self) {
        self.page = self.cursor / self.page_size + 1;
    }
}

/// Conversation pane state
#[derive(Debug, Default)]
pub struct ChatViewScreen {
    /// Input buffer for message composition
    pub input: String,
    /// Messages scrolled up from the bottom
    pub scroll_offset: usize,
}

impl ChatViewScreen {
    /// Create new conversation pane
    pub fn new() -> Self {
        Self::default()
    }

    /// Add character to input
    pub fn add_char(&mut self, c: char) {
        self.input.push(c);
    }

    /// Remove last character from input
    pub fn backspace(&mut self) {
        self.input.pop();
    }

    /// Clear input buffer
    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Whether the input holds anything worth sending
    pub fn has_text(&self) -> bool {
        !self.input.trim().is_empty()
    }

    /// Scroll towards older messages
    pub fn scroll_up(&mut self, max_offset: usize) {
        if self.scroll_offset < max_offset {
            self.scroll_offset += 1;
        }
    }

    /// Scroll towards the newest message
    pub fn scroll_down(&mut self) {
        if self.scroll_offset > 0 {
            self.scroll_offset -= 1;
        }
    }

    /// Jump back to the newest message
    pub fn reset_scroll(&mut self) {
        self.scroll_offset = 0;
    }
}

//! Core types for TUI navigation

/// Dashboard pane that receives key input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Paginated chat list
    #[default]
    ChatList,
    /// Compose box of the active conversation
    Compose,
}

impl Focus {
    /// The other pane
    pub fn toggled(self) -> Self {
        match self {
            Self::ChatList => Self::Compose,
            Self::Compose => Self::ChatList,
        }
    }

    /// Key help shown in the status bar
    pub fn help(&self) -> &str {
        match self {
            Self::ChatList => {
                "↑↓/j/k: Move | ←→/PgUp/PgDn: Page | Enter: Open | r: Refresh | Tab: Compose | q: Quit"
            }
            Self::Compose => "Enter: Send | Ctrl-R: Retry failed | ↑↓: Scroll | Tab/Esc: Chat list",
        }
    }
}

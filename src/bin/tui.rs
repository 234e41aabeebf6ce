//! Chatdesk TUI (Terminal User Interface)
//!
//! A terminal dashboard for answering support chats.

use anyhow::Context;
use chatdesk::config::{Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use chatdesk::transport::HttpTransport;
use chatdesk::tui::{ui::ui, App, Focus};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut settings = Settings::load(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;
    settings.apply_env_overrides();
    settings.validate().context("invalid settings")?;

    chatdesk::init_logging(Some(PathBuf::from(&settings.log_file).as_path()))?;
    info!("Starting chatdesk against {}", settings.api_base_url);

    let transport = Arc::new(HttpTransport::new(&settings)?);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state and go live
    let mut app = App::new(&settings, transport);
    app.start();

    // Run main loop
    let res = run_app(&mut terminal, &mut app);

    app.shutdown().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("TUI loop failed: {}", err);
        println!("Error: {:?}", err);
    }

    info!("Chatdesk stopped");
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // Channel pushes and finished API calls
        app.drain_events();

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    app.retry_failed();
                    continue;
                }
                if key.code == KeyCode::Tab {
                    app.toggle_focus();
                    continue;
                }

                let chat_count = app.store.logs().len();
                match app.focus {
                    Focus::ChatList => match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            app.should_quit = true;
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            app.chat_list_screen.next(chat_count);
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            app.chat_list_screen.previous(chat_count);
                        }
                        KeyCode::Right | KeyCode::PageDown => {
                            app.chat_list_screen.next_page(chat_count);
                        }
                        KeyCode::Left | KeyCode::PageUp => {
                            app.chat_list_screen.previous_page(chat_count);
                        }
                        KeyCode::Enter => {
                            app.open_selected_chat();
                        }
                        KeyCode::Char('r') => {
                            app.refresh();
                        }
                        _ => {}
                    },
                    Focus::Compose => match key.code {
                        KeyCode::Esc => {
                            app.toggle_focus();
                        }
                        KeyCode::Enter => {
                            app.send_message();
                        }
                        KeyCode::Backspace => {
                            app.chat_view_screen.backspace();
                        }
                        KeyCode::Up => {
                            let max_offset = app
                                .store
                                .selected_chat()
                                .map(|chat| chat.messages.len().saturating_sub(1))
                                .unwrap_or(0);
                            app.chat_view_screen.scroll_up(max_offset);
                        }
                        KeyCode::Down => {
                            app.chat_view_screen.scroll_down();
                        }
                        KeyCode::Char(c) if !c.is_control() => {
                            app.chat_view_screen.add_char(c);
                        }
                        _ => {}
                    },
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

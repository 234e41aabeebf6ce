//! Main TUI application state and logic
//!
//! `App` is the single owner of the session: it holds the `ChatStore`, the
//! live channel handle and the in-flight API tasks. Results of those tasks
//! and channel events come back as [`AppEvent`]s and are applied one at a
//! time through [`App::handle_event`], so the store never needs a lock.

use crate::channel::{ChannelConfig, ChannelEvent, ConnectionState, LiveChannel};
use crate::config::Settings;
use crate::store::{ChatLog, ChatStore, OutboundMessage};
use crate::transport::ChatTransport;
use crate::tui::screens::{ChatListScreen, ChatViewScreen};
use crate::tui::types::Focus;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Something that happened outside the key handler
#[derive(Debug)]
pub enum AppEvent {
    /// Event from the live channel
    Channel(ChannelEvent),
    /// A chat list fetch completed
    SnapshotLoaded {
        /// Fetch the result belongs to
        generation: u64,
        /// Fetched chat logs
        result: Result<Vec<ChatLog>>,
    },
    /// An append request completed
    SendFinished {
        /// Optimistic message the request was for
        local_id: Uuid,
        /// Outcome of the request
        result: Result<()>,
    },
}

/// Application state
pub struct App {
    /// Conversations, selection and status
    pub store: ChatStore,
    /// Pane receiving key input
    pub focus: Focus,
    /// Chat list pane
    pub chat_list_screen: ChatListScreen,
    /// Conversation pane
    pub chat_view_screen: ChatViewScreen,
    /// Should quit
    pub should_quit: bool,
    transport: Arc<dyn ChatTransport>,
    channel: Option<LiveChannel>,
    channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
    task_events_tx: mpsc::UnboundedSender<AppEvent>,
    task_events: mpsc::UnboundedReceiver<AppEvent>,
    fetch_generation: u64,
    fetch_task: Option<JoinHandle<()>>,
    sends_in_flight: usize,
}

impl App {
    /// Create the application
    ///
    /// Spawns the live channel task, so this must run inside a tokio
    /// runtime. Nothing connects or fetches until [`start`](Self::start).
    pub fn new(settings: &Settings, transport: Arc<dyn ChatTransport>) -> Self {
        let (channel_tx, channel_events) = mpsc::unbounded_channel();
        let (task_events_tx, task_events) = mpsc::unbounded_channel();
        let channel = LiveChannel::spawn(ChannelConfig::from(settings), channel_tx);

        Self {
            store: ChatStore::new(),
            focus: Focus::default(),
            chat_list_screen: ChatListScreen::new(settings.page_size),
            chat_view_screen: ChatViewScreen::new(),
            should_quit: false,
            transport,
            channel: Some(channel),
            channel_events,
            task_events_tx,
            task_events,
            fetch_generation: 0,
            fetch_task: None,
            sends_in_flight: 0,
        }
    }

    /// Open the live channel and load the chat list
    pub fn start(&mut self) {
        if let Some(channel) = &self.channel {
            channel.start();
        }
        self.refresh();
    }

    /// Fetch a fresh snapshot, abandoning any fetch still in flight
    pub fn refresh(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }

        self.fetch_generation += 1;
        let generation = self.fetch_generation;
        let transport = self.transport.clone();
        let events = self.task_events_tx.clone();

        debug!("Starting chat list fetch #{}", generation);
        self.fetch_task = Some(tokio::spawn(async move {
            let result = transport.fetch_chat_logs().await;
            let _ = events.send(AppEvent::SnapshotLoaded { generation, result });
        }));
    }

    /// Wait for the next event
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        tokio::select! {
            Some(event) = self.channel_events.recv() => Some(AppEvent::Channel(event)),
            Some(event) = self.task_events.recv() => Some(event),
            else => None,
        }
    }

    /// Take the next event if one is ready
    pub fn try_next_event(&mut self) -> Option<AppEvent> {
        if let Ok(event) = self.channel_events.try_recv() {
            return Some(AppEvent::Channel(event));
        }
        self.task_events.try_recv().ok()
    }

    /// Apply every event that is ready; returns how many were applied
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.try_next_event() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Apply one event to the store
    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Channel(ChannelEvent::Connectivity(state)) => {
                info!("Live channel is {:?}", state);
                self.store.observe_connection(state);
            }
            AppEvent::Channel(ChannelEvent::MessageAppended { client_id, message }) => {
                if !self.store.apply_pushed_message(&client_id, message) {
                    info!("Message for unknown client {}, refreshing chat list", client_id);
                    self.refresh();
                }
            }
            AppEvent::SnapshotLoaded { generation, result } => {
                if generation != self.fetch_generation {
                    debug!("Discarding stale fetch #{}", generation);
                    return;
                }
                self.fetch_task = None;
                match result {
                    Ok(logs) => {
                        self.store.apply_snapshot(logs);
                        self.chat_list_screen.clamp(self.store.logs().len());
                    }
                    Err(e) => self.store.report_error(format!("Failed to load chats: {}", e)),
                }
            }
            AppEvent::SendFinished { local_id, result } => {
                self.sends_in_flight = self.sends_in_flight.saturating_sub(1);
                match result {
                    Ok(()) => {
                        self.store.confirm_send(local_id);
                        self.refresh();
                    }
                    Err(e) => self.store.fail_send(local_id, &e),
                }
            }
        }
    }

    /// Last connectivity state reported by the live channel
    pub fn connection_state(&self) -> ConnectionState {
        self.store.connection_state()
    }

    /// Whether a send request is outstanding
    pub fn is_sending(&self) -> bool {
        self.sends_in_flight > 0
    }

    /// Whether the compose box may be sent right now
    pub fn can_send(&self) -> bool {
        self.chat_view_screen.has_text()
            && self.store.selected_chat().is_some()
            && !self.is_sending()
            && self.connection_state().is_online()
    }

    /// Send the compose box to the active chat
    pub fn send_message(&mut self) {
        if !self.can_send() {
            return;
        }

        match self.store.send_message(&self.chat_view_screen.input, Utc::now()) {
            Ok(outbound) => {
                self.chat_view_screen.clear_input();
                self.chat_view_screen.reset_scroll();
                self.dispatch_send(outbound);
            }
            Err(e) => debug!("Send suppressed: {}", e),
        }
    }

    /// Resend every failed message of the active chat
    pub fn retry_failed(&mut self) {
        if !self.connection_state().is_online() {
            warn!("Not retrying failed messages while offline");
            return;
        }
        if self.is_sending() {
            debug!("Not retrying failed messages while a send is in flight");
            return;
        }
        for outbound in self.store.retry_failed() {
            self.dispatch_send(outbound);
        }
    }

    fn dispatch_send(&mut self, outbound: OutboundMessage) {
        self.sends_in_flight += 1;
        let transport = self.transport.clone();
        let events = self.task_events_tx.clone();

        tokio::spawn(async move {
            let OutboundMessage {
                client_id,
                local_id,
                message,
            } = outbound;
            let result = transport.append_message(&client_id, &message).await;
            let _ = events.send(AppEvent::SendFinished { local_id, result });
        });
    }

    /// Make the chat under the list cursor active and focus the compose box
    pub fn open_selected_chat(&mut self) {
        let Some(id) = self
            .store
            .logs()
            .get(self.chat_list_screen.cursor)
            .map(|log| log.id.clone())
        else {
            return;
        };

        if self.store.select_chat(&id) {
            self.chat_view_screen.reset_scroll();
            self.focus = Focus::Compose;
        }
    }

    /// Switch keyboard focus between the panes
    pub fn toggle_focus(&mut self) {
        self.focus = self.focus.toggled();
    }

    /// Stop the live channel and abandon pending fetches
    pub async fn shutdown(mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(channel) = self.channel.take() {
            channel.shutdown().await;
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }
}

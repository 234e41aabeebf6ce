//! Shared test helpers for app tests

use crate::channel::{ChannelEvent, ConnectionState};
use crate::config::Settings;
use crate::store::{ChatLog, Message};
use crate::transport::ChatTransport;
use crate::tui::{App, AppEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory backend standing in for the chat-log API
#[derive(Default)]
pub struct MockTransport {
    pub logs: Mutex<Vec<ChatLog>>,
    pub appended: Mutex<Vec<(String, Message)>>,
    pub fetches: AtomicUsize,
    pub fail_fetch: AtomicBool,
    pub fail_append: AtomicBool,
}

impl MockTransport {
    pub fn with_logs(logs: Vec<ChatLog>) -> Arc<Self> {
        Arc::new(Self {
            logs: Mutex::new(logs),
            ..Self::default()
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn append_count(&self) -> usize {
        self.appended.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn fetch_chat_logs(&self) -> Result<Vec<ChatLog>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Transport("backend down".to_string()));
        }
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn append_message(&self, client_id: &str, message: &Message) -> Result<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(Error::Transport("append rejected".to_string()));
        }

        // Store what the backend would: the wire fields only
        let stored = Message::new(message.sender, message.content.clone(), message.timestamp);
        let mut logs = self.logs.lock().unwrap();
        if let Some(log) = logs.iter_mut().find(|l| l.client_id == client_id) {
            log.messages.push(stored);
        }
        self.appended
            .lock()
            .unwrap()
            .push((client_id.to_string(), message.clone()));
        Ok(())
    }
}

/// Two chats: "a" for client "c1" and "b" for client "c2"
pub fn two_chats() -> Vec<ChatLog> {
    vec![ChatLog::new("a", "c1"), ChatLog::new("b", "c2")]
}

/// Create an App over a mock backend; must run inside a tokio runtime
pub fn create_test_app(transport: Arc<MockTransport>) -> App {
    App::new(&Settings::default(), transport)
}

/// Apply events until `done` holds, failing after a few seconds
pub async fn pump_until<F>(app: &mut App, done: F)
where
    F: Fn(&App) -> bool,
{
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        while !done(app) {
            match app.next_event().await {
                Some(event) => app.handle_event(event),
                None => break,
            }
        }
    })
    .await;
    assert!(result.is_ok(), "Timed out waiting for app state");
}

/// Load the initial snapshot and mark the live channel online
pub async fn loaded_online_app(transport: Arc<MockTransport>) -> App {
    let mut app = create_test_app(transport);
    app.refresh();
    pump_until(&mut app, |app| !app.store.logs().is_empty()).await;
    go_online(&mut app);
    app
}

pub fn go_online(app: &mut App) {
    app.handle_event(AppEvent::Channel(ChannelEvent::Connectivity(
        ConnectionState::Connected,
    )));
}

// Sync Tests - Testing snapshot loading, pushed messages and connectivity

use super::helpers::*;
use crate::channel::{ChannelEvent, ConnectionState};
use crate::store::{ChatLog, Message, Sender};
use crate::tui::AppEvent;
use chrono::Utc;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_new_app_is_idle() {
    let transport = MockTransport::with_logs(two_chats());
    let app = create_test_app(transport.clone());

    assert!(app.store.logs().is_empty());
    assert_eq!(app.connection_state(), ConnectionState::Disconnected);
    assert!(!app.should_quit);
    assert_eq!(transport.fetch_count(), 0, "Nothing is fetched before start");
}

#[tokio::test]
async fn test_refresh_loads_snapshot_and_selects_first() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = create_test_app(transport.clone());

    app.refresh();
    pump_until(&mut app, |app| !app.store.logs().is_empty()).await;

    assert_eq!(app.store.logs().len(), 2);
    assert_eq!(app.store.selected_id(), Some("a"));
    assert_eq!(transport.fetch_count(), 1);
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_chats() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;

    transport.fail_fetch.store(true, Ordering::SeqCst);
    app.refresh();
    pump_until(&mut app, |app| app.store.last_error().is_some()).await;

    assert_eq!(app.store.logs().len(), 2, "Loaded chats survive a failed fetch");
    assert!(app.store.last_error().unwrap().contains("backend down"));
}

#[tokio::test]
async fn test_stale_snapshot_is_discarded() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = create_test_app(transport);

    app.refresh();
    app.refresh();

    // A result tagged with the superseded fetch must not be applied
    app.handle_event(AppEvent::SnapshotLoaded {
        generation: 1,
        result: Ok(vec![ChatLog::new("stale", "old")]),
    });
    assert!(app.store.logs().is_empty());

    pump_until(&mut app, |app| !app.store.logs().is_empty()).await;
    assert!(app.store.chat("stale").is_none());
    assert_eq!(app.store.logs().len(), 2);
}

#[tokio::test]
async fn test_push_to_other_chat_marks_unread() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;

    app.handle_event(AppEvent::Channel(ChannelEvent::MessageAppended {
        client_id: "c2".to_string(),
        message: Message::new(Sender::Customer, "anyone there?", Utc::now()),
    }));

    let b = app.store.chat("b").unwrap();
    assert!(b.unread);
    assert_eq!(b.messages.len(), 1);
    assert!(!app.store.chat("a").unwrap().unread);
    assert_eq!(transport.fetch_count(), 1, "Known client needs no refresh");
}

#[tokio::test]
async fn test_push_for_unknown_client_triggers_refresh() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;

    let mut new_chat = ChatLog::new("c", "c3");
    let msg = Message::new(Sender::Customer, "first contact", Utc::now());
    new_chat.messages.push(msg.clone());
    transport.logs.lock().unwrap().push(new_chat);

    app.handle_event(AppEvent::Channel(ChannelEvent::MessageAppended {
        client_id: "c3".to_string(),
        message: msg,
    }));
    pump_until(&mut app, |app| app.store.chat("c").is_some()).await;

    assert_eq!(transport.fetch_count(), 2);
    assert_eq!(app.store.chat("c").unwrap().messages.len(), 1);
}

#[tokio::test]
async fn test_connectivity_events_update_state() {
    let transport = MockTransport::with_logs(Vec::new());
    let mut app = create_test_app(transport);

    app.handle_event(AppEvent::Channel(ChannelEvent::Connectivity(
        ConnectionState::Connected,
    )));
    assert!(app.connection_state().is_online());

    app.handle_event(AppEvent::Channel(ChannelEvent::Connectivity(
        ConnectionState::Disconnected,
    )));
    assert!(!app.connection_state().is_online());
}

#[tokio::test]
async fn test_snapshot_clamps_list_cursor() {
    let logs: Vec<ChatLog> = (0..7)
        .map(|i| ChatLog::new(format!("id{}", i), format!("c{}", i)))
        .collect();
    let transport = MockTransport::with_logs(logs);
    let mut app = loaded_online_app(transport.clone()).await;

    app.chat_list_screen.focus_index(6, 7);
    assert_eq!(app.chat_list_screen.page, 2);

    transport.logs.lock().unwrap().truncate(3);
    app.refresh();
    pump_until(&mut app, |app| app.store.logs().len() == 3).await;

    assert_eq!(app.chat_list_screen.cursor, 2);
    assert_eq!(app.chat_list_screen.page, 1);
}

#[tokio::test]
async fn test_shutdown_completes() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = create_test_app(transport);
    app.refresh();

    app.shutdown().await;
}

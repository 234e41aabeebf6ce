// Messaging Tests - Testing sends, failures and retries through the App

use super::helpers::*;
use crate::channel::{ChannelEvent, ConnectionState};
use crate::store::{DeliveryStatus, Sender};
use crate::tui::AppEvent;
use std::sync::atomic::Ordering;

fn type_text(app: &mut crate::tui::App, text: &str) {
    for c in text.chars() {
        app.chat_view_screen.add_char(c);
    }
}

#[tokio::test]
async fn test_blank_message_is_not_sent() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;

    type_text(&mut app, "   ");
    assert!(!app.can_send());
    app.send_message();

    assert!(!app.is_sending());
    assert!(app.store.selected_chat().unwrap().messages.is_empty());
    assert_eq!(transport.append_count(), 0);
}

#[tokio::test]
async fn test_send_disabled_while_offline() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;
    app.handle_event(AppEvent::Channel(ChannelEvent::Connectivity(
        ConnectionState::Disconnected,
    )));

    type_text(&mut app, "hello");
    assert!(!app.can_send());
    app.send_message();

    assert_eq!(app.chat_view_screen.input, "hello", "Input is kept for later");
    assert!(app.store.selected_chat().unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_send_appends_and_refreshes_without_duplicates() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;

    type_text(&mut app, "hi");
    assert!(app.can_send());
    app.send_message();

    // Optimistic copy shows up immediately
    let a = app.store.selected_chat().unwrap();
    assert_eq!(a.messages.len(), 1);
    assert_eq!(a.messages[0].sender, Sender::Operator);
    assert_eq!(a.messages[0].status, DeliveryStatus::Pending);
    assert!(app.chat_view_screen.input.is_empty());
    assert!(app.is_sending());
    assert!(!app.can_send(), "Only one send in flight");

    // Acknowledgement triggers a refresh that contains the message
    pump_until(&mut app, |app| !app.is_sending()).await;
    pump_until(&mut app, |app| {
        app.store.selected_chat().unwrap().messages[0].status == DeliveryStatus::Confirmed
    })
    .await;

    let a = app.store.selected_chat().unwrap();
    assert_eq!(a.messages.len(), 1, "\"hi\" must appear exactly once");
    assert_eq!(a.messages[0].content, "hi");
    assert_eq!(transport.fetch_count(), 2);

    let appended = transport.appended.lock().unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].0, "c1");
}

#[tokio::test]
async fn test_failed_send_is_marked_and_reported() {
    let transport = MockTransport::with_logs(two_chats());
    transport.fail_append.store(true, Ordering::SeqCst);
    let mut app = loaded_online_app(transport.clone()).await;

    type_text(&mut app, "will fail");
    app.send_message();
    pump_until(&mut app, |app| !app.is_sending()).await;

    let a = app.store.selected_chat().unwrap();
    assert_eq!(a.messages.len(), 1, "Failed message stays visible");
    assert_eq!(a.messages[0].status, DeliveryStatus::Failed);
    assert!(app.store.last_error().unwrap().contains("append rejected"));
    assert_eq!(transport.fetch_count(), 1, "No refresh after a failed send");
}

#[tokio::test]
async fn test_retry_failed_resends() {
    let transport = MockTransport::with_logs(two_chats());
    transport.fail_append.store(true, Ordering::SeqCst);
    let mut app = loaded_online_app(transport.clone()).await;

    type_text(&mut app, "second try");
    app.send_message();
    pump_until(&mut app, |app| !app.is_sending()).await;

    transport.fail_append.store(false, Ordering::SeqCst);
    app.retry_failed();
    assert!(app.is_sending());
    assert_eq!(
        app.store.selected_chat().unwrap().messages[0].status,
        DeliveryStatus::Pending
    );

    pump_until(&mut app, |app| !app.is_sending()).await;
    pump_until(&mut app, |app| {
        app.store.selected_chat().unwrap().messages[0].status == DeliveryStatus::Confirmed
    })
    .await;

    assert_eq!(transport.append_count(), 1);
    assert_eq!(app.store.selected_chat().unwrap().messages.len(), 1);
}

#[tokio::test]
async fn test_retry_waits_for_send_in_flight() {
    let transport = MockTransport::with_logs(two_chats());
    transport.fail_append.store(true, Ordering::SeqCst);
    let mut app = loaded_online_app(transport.clone()).await;

    type_text(&mut app, "first");
    app.send_message();
    pump_until(&mut app, |app| !app.is_sending()).await;

    transport.fail_append.store(false, Ordering::SeqCst);
    type_text(&mut app, "second");
    app.send_message();
    assert!(app.is_sending());

    app.retry_failed();
    assert_eq!(
        app.store.selected_chat().unwrap().failed_count(),
        1,
        "Retry is held back while a send is outstanding"
    );

    pump_until(&mut app, |app| !app.is_sending()).await;
    let appended = transport.appended.lock().unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].1.content, "second");
}

#[tokio::test]
async fn test_retry_skipped_while_offline() {
    let transport = MockTransport::with_logs(two_chats());
    transport.fail_append.store(true, Ordering::SeqCst);
    let mut app = loaded_online_app(transport.clone()).await;

    type_text(&mut app, "x");
    app.send_message();
    pump_until(&mut app, |app| !app.is_sending()).await;

    app.handle_event(AppEvent::Channel(ChannelEvent::Connectivity(
        ConnectionState::Disconnected,
    )));
    app.retry_failed();

    assert!(!app.is_sending());
    assert_eq!(app.store.selected_chat().unwrap().failed_count(), 1);
}

#[tokio::test]
async fn test_send_goes_to_selected_chat() {
    let transport = MockTransport::with_logs(two_chats());
    let mut app = loaded_online_app(transport.clone()).await;

    assert!(app.store.select_chat("b"));
    type_text(&mut app, "for b");
    app.send_message();
    pump_until(&mut app, |app| !app.is_sending()).await;

    let appended = transport.appended.lock().unwrap();
    assert_eq!(appended[0].0, "c2");
    assert!(app.store.chat("a").unwrap().messages.is_empty());
}

//! Chat session integration tests
//!
//! Sessions run against in-memory sockets and a fake REST API.

use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tokio::time::timeout;

use shoot_client::client::chat::{room_topic, ChatSession, SearchState, SearchView};
use shoot_client::client::offline::{BackoffStrategy, ProcessOutcome, RetryPolicy};
use shoot_client::client::transport::frame::{StompCommand, StompFrame};
use shoot_client::client::transport::ConnectionState;
use shoot_client::shared::config::AppConfigBuilder;
use shoot_client::shared::error::{ShootError, ValidationError};
use shoot_client::shared::message::{Message, MessageStatus, PendingMessage, QueueStatus};

use crate::common::*;

async fn wait_until(session: &ChatSession, predicate: impl Fn(&[Message]) -> bool) {
    let mut messages = session.watch_messages();
    timeout(Duration::from_secs(2), messages.wait_for(|m| predicate(m)))
        .await
        .expect("timed out waiting for message list")
        .unwrap();
}

fn room_frame(body: String) -> StompFrame {
    StompFrame::new(StompCommand::Message)
        .with_header("destination", room_topic(ROOM))
        .with_header("subscription", "sub-0")
        .with_body(body)
}

fn sends(frames: Vec<StompFrame>) -> Vec<StompFrame> {
    frames
        .into_iter()
        .filter(|f| f.command == StompCommand::Send && f.destination() == Some("/app/chat"))
        .collect()
}

#[tokio::test]
async fn test_offline_message_delivered_exactly_once() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    harness.connector.set_offline(true);
    harness.api.set_offline(true);

    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    assert_matches!(session.connection_state(), ConnectionState::Error(_));

    let temp_id = session.send_message("sent while offline").await.unwrap().unwrap();
    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].status, MessageStatus::Failed);
    assert!(session.error().is_some());
    assert_eq!(harness.queue.get(&temp_id).unwrap().status, QueueStatus::Pending);

    harness.connector.set_offline(false);
    harness.api.set_offline(false);
    let outcome = session.reconnect().await.unwrap();
    assert_matches!(outcome, ProcessOutcome::Completed(summary) if summary.delivered == 1);
    assert_eq!(harness.queue.pending_count(), 0);
    assert_eq!(session.messages()[0].status, MessageStatus::SentToKafka);

    let mut peer = harness.connector.accept().await.unwrap();
    let published = sends(peer.drain_frames());
    assert_eq!(published.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&published[0].body).unwrap();
    assert_eq!(body["tempId"], temp_id.as_str());
    assert_eq!(body["content"]["text"], "sent while offline");
    assert_eq!(harness.api.sent_count(), 0);

    let mut confirmed = server_message("m1", ME, "sent while offline", 0);
    confirmed.temp_id = Some(temp_id.clone());
    peer.push_frame(room_frame(serde_json::to_string(&confirmed).unwrap()));
    wait_until(&session, |m| m.iter().any(|m| m.id == "m1")).await;

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].temp_id.as_deref(), Some(temp_id.as_str()));

    let outcome = session.flush_offline_queue().await.unwrap();
    assert_matches!(outcome, ProcessOutcome::Completed(summary) if summary.attempted == 0);
    assert!(sends(peer.drain_frames()).is_empty());
}

#[tokio::test]
async fn test_retry_is_noop_unless_failed() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let mut peer = harness.connector.accept().await.unwrap();

    session.send_message("hello").await.unwrap();
    let sent = session.messages()[0].clone();
    assert_eq!(sent.status, MessageStatus::SentToKafka);

    assert!(!session.retry_message(&sent).await.unwrap());
    assert_eq!(sends(peer.drain_frames()).len(), 1);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(harness.queue.pending_count(), 0);
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();

    assert_eq!(session.send_message("   \n").await.unwrap(), None);
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn test_failed_retries_keep_one_entry() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let mut peer = harness.connector.accept().await.unwrap();
    peer.break_writes();
    harness.api.set_offline(true);

    let temp_id = session.send_message("flaky").await.unwrap().unwrap();
    for _ in 0..2 {
        let failed = session.messages()[0].clone();
        assert_eq!(failed.status, MessageStatus::Failed);
        assert!(session.retry_message(&failed).await.unwrap());
    }
    assert_eq!(session.messages().len(), 1);
    assert_eq!(harness.queue.pending_count(), 1);
    assert_eq!(harness.queue.get(&temp_id).unwrap().retry_count, 2);

    harness.api.set_offline(false);
    let failed = session.messages()[0].clone();
    assert!(session.retry_message(&failed).await.unwrap());

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].status, MessageStatus::Saved);
    assert_eq!(messages[0].temp_id.as_deref(), Some(temp_id.as_str()));
    assert_eq!(harness.queue.pending_count(), 0);

    let sent = harness.api.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].temp_id, temp_id);
}

#[tokio::test]
async fn test_retry_skips_message_being_flushed() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    harness.connector.set_offline(true);
    harness.api.set_offline(true);
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();

    let temp_id = session.send_message("queued").await.unwrap().unwrap();
    harness.queue.update_status(&temp_id, QueueStatus::Sending).await.unwrap();

    let failed = session.messages()[0].clone();
    assert!(!session.retry_message(&failed).await.unwrap());
    assert_eq!(harness.queue.get(&temp_id).unwrap().status, QueueStatus::Sending);
}

#[tokio::test]
async fn test_open_loads_history_queue_and_marks_read() {
    let mut seen = server_message("m2", FRIEND, "seen", 60);
    seen.read_by.insert(ME);
    let api = FakeMessageApi::with_history(vec![
        server_message("m3", FRIEND, "newest", 10),
        seen,
        server_message("m1", FRIEND, "oldest", 120),
        server_message("m4", ME, "mine", 5),
    ]);
    let harness = Harness::new(api).await;
    harness
        .queue
        .enqueue(PendingMessage::new("temp_q1", ROOM, ME, "queued"))
        .await
        .unwrap();
    harness
        .queue
        .enqueue(PendingMessage::new("temp_q2", 99, ME, "other room"))
        .await
        .unwrap();

    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let ids: Vec<String> = session.messages().iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "temp_q1"]);

    let reads = harness.api.read_requests.lock().unwrap().clone();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].message_ids, vec!["m1".to_string(), "m3".to_string()]);
    assert!(session.messages()[0].read_by.contains(&ME));

    let mut peer = harness.connector.accept().await.unwrap();
    assert!(peer.url.ends_with("/ws?token=test-token"));
    let subscribe = peer.recv_command(StompCommand::Subscribe).await.unwrap();
    assert_eq!(subscribe.destination(), Some("/topic/chat/42"));
}

#[tokio::test]
async fn test_status_updates_and_typing_from_room_topic() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let peer = harness.connector.accept().await.unwrap();

    let temp_id = session.send_message("hi").await.unwrap().unwrap();
    let update = serde_json::json!({"tempId": temp_id, "messageId": "m77", "status": "SAVED"});
    peer.push_frame(room_frame(update.to_string()));
    wait_until(&session, |m| m.first().is_some_and(|m| m.id == "m77")).await;
    assert_eq!(session.messages()[0].status, MessageStatus::Saved);

    let mut typing = session.watch_typing();
    let event = serde_json::json!({"roomId": ROOM, "userId": FRIEND, "isTyping": true});
    peer.push_frame(room_frame(event.to_string()));
    timeout(Duration::from_secs(2), typing.wait_for(|users| users.contains(&FRIEND)))
        .await
        .unwrap()
        .unwrap();

    let own = serde_json::json!({"roomId": ROOM, "userId": ME, "isTyping": true});
    peer.push_frame(room_frame(own.to_string()));
    let stop = serde_json::json!({"roomId": ROOM, "userId": FRIEND, "isTyping": false});
    peer.push_frame(room_frame(stop.to_string()));
    timeout(Duration::from_secs(2), typing.wait_for(|users| users.is_empty()))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_send_typing_publishes_event() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let mut peer = harness.connector.accept().await.unwrap();

    session.send_typing(true).await;
    let frame = peer.recv_command(StompCommand::Send).await.unwrap();
    assert_eq!(frame.destination(), Some("/app/chat/typing"));
    let body: serde_json::Value = serde_json::from_str(&frame.body).unwrap();
    assert_eq!(body, serde_json::json!({"roomId": 42, "userId": 7, "isTyping": true}));
}

#[tokio::test]
async fn test_search_requires_two_characters() {
    let api = FakeMessageApi::new();
    *api.search_results.lock().unwrap() = vec![
        server_message("old", FRIEND, "lunch?", 300),
        server_message("new", FRIEND, "lunch now", 10),
    ];
    let harness = Harness::new(api).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();

    session.enter_search_mode();
    session.update_search_query("l").await.unwrap();
    let view = session.search();
    assert!(view.active);
    assert_eq!(view.state, SearchState::Idle);
    assert!(harness.api.search_queries.lock().unwrap().is_empty());

    session.update_search_query("lunch").await.unwrap();
    let view = session.search();
    assert_eq!(view.state, SearchState::Results(2));
    let ids: Vec<&str> = view.results.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert_eq!(*harness.api.search_queries.lock().unwrap(), vec!["lunch".to_string()]);

    session.update_search_query("").await.unwrap();
    assert!(session.search().results.is_empty());

    session.exit_search_mode();
    assert_eq!(session.search(), SearchView::default());
}

#[tokio::test]
async fn test_edit_and_reaction_replace_in_place() {
    let api = FakeMessageApi::with_history(vec![
        server_message("m1", ME, "typo", 30),
        server_message("m2", FRIEND, "hello", 20),
    ]);
    let harness = Harness::new(api).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();

    session.edit_message("m1", "fixed").await.unwrap();
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content.text, "fixed");
    assert!(messages[0].content.is_edited);

    session.toggle_reaction("m2", "👍").await.unwrap();
    assert!(session.messages()[1].reactions["👍"].contains(&ME));
    assert_eq!(session.position_of("m2"), Some(1));

    let err = session.edit_message("m1", "  ").await.unwrap_err();
    assert_eq!(err, ShootError::Validation(ValidationError::EmptyField("content".into())));

    let err = session.delete_message("missing").await.unwrap_err();
    assert!(session.error().is_some());
    assert_matches!(err, ShootError::Chat(_));
}

#[tokio::test]
async fn test_supervisor_reconnects_after_error() {
    let config = test_config(
        AppConfigBuilder::default()
            .auto_reconnect(true)
            .reconnect_policy(RetryPolicy::new(3, BackoffStrategy::Fixed { interval_ms: 10 })),
    );
    let harness = Harness::with_config(FakeMessageApi::new(), config).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();

    let first = harness.connector.accept().await.unwrap();
    first.fail("connection reset");

    let mut second = timeout(Duration::from_secs(2), harness.connector.accept())
        .await
        .unwrap()
        .unwrap();
    let subscribe = timeout(Duration::from_secs(2), second.recv_command(StompCommand::Subscribe))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subscribe.destination(), Some("/topic/chat/42"));
    assert!(session.connection_state().is_connected());
    assert_eq!(harness.connector.connections_opened(), 2);
}

#[tokio::test]
async fn test_supervisor_connects_session_opened_offline() {
    let config = test_config(
        AppConfigBuilder::default()
            .auto_reconnect(true)
            .reconnect_policy(RetryPolicy::new(3, BackoffStrategy::Fixed { interval_ms: 10 })),
    );
    let harness = Harness::with_config(FakeMessageApi::new(), config).await;
    harness
        .queue
        .enqueue(PendingMessage::new("temp_q1", ROOM, ME, "queued before open"))
        .await
        .unwrap();
    harness.connector.set_offline(true);

    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    assert_matches!(session.connection_state(), ConnectionState::Error(_));
    harness.connector.set_offline(false);

    let mut peer = timeout(Duration::from_secs(2), harness.connector.accept())
        .await
        .unwrap()
        .unwrap();
    let frame = timeout(Duration::from_secs(2), peer.recv_command(StompCommand::Send))
        .await
        .unwrap()
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&frame.body).unwrap();
    assert_eq!(body["tempId"], "temp_q1");

    wait_until(&session, |m| {
        m.first().is_some_and(|m| m.status == MessageStatus::SentToKafka)
    })
    .await;
    assert_eq!(harness.queue.pending_count(), 0);
    assert!(session.connection_state().is_connected());
    assert_eq!(harness.api.sent_count(), 0);
}

#[tokio::test]
async fn test_open_flushes_queue_when_connected() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    harness
        .queue
        .enqueue(PendingMessage::new("temp_q1", ROOM, ME, "left over"))
        .await
        .unwrap();

    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    assert_eq!(harness.queue.pending_count(), 0);
    assert_eq!(session.messages()[0].status, MessageStatus::SentToKafka);

    let mut peer = harness.connector.accept().await.unwrap();
    let published = sends(peer.drain_frames());
    assert_eq!(published.len(), 1);
}

#[tokio::test]
async fn test_retry_ignores_message_of_other_room() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let mut peer = harness.connector.accept().await.unwrap();

    let mut stranger = Message::optimistic("temp_other".to_string(), 99, ME, "elsewhere");
    stranger.status = MessageStatus::Failed;

    assert!(!session.retry_message(&stranger).await.unwrap());
    assert!(session.messages().is_empty());
    assert_eq!(harness.queue.pending_count(), 0);
    assert_eq!(harness.api.sent_count(), 0);
    assert!(sends(peer.drain_frames()).is_empty());
}

#[tokio::test]
async fn test_close_disconnects() {
    let harness = Harness::new(FakeMessageApi::new()).await;
    let session = ChatSession::open(harness.deps(), ROOM, ME).await.unwrap();
    let mut peer = harness.connector.accept().await.unwrap();

    session.close().await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
    let frames = peer.drain_frames();
    assert!(frames.iter().any(|f| f.command == StompCommand::Disconnect));
}

//! Engine Retry Tests
//!
//! Retry-by-truncation and resubmission of an already-present user message.

use std::sync::Arc;

use tokio::sync::mpsc;

use lorebase_desktop::models::chat::{ChatRole, Conversation};
use lorebase_desktop::services::streaming::StreamEvent;

use crate::support::{engine_with, server_message, settle, FakeBackend, FakeTransport, ScriptedOpen};

fn two_turn_conversation(id: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        title: "Research".to_string(),
        messages: vec![
            server_message("m1", ChatRole::User, "first question"),
            server_message("m2", ChatRole::Assistant, "first answer"),
            server_message("m3", ChatRole::User, "second question"),
            server_message("m4", ChatRole::Assistant, "second answer"),
        ],
    }
}

#[tokio::test]
async fn test_retry_truncates_through_user_message_and_resends() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_canonical(two_turn_conversation("c1"));
    let transport = Arc::new(FakeTransport::new(vec![ScriptedOpen::Events(vec![
        Ok(StreamEvent::ContentDelta("retried answer".to_string())),
        Ok(StreamEvent::Done("retried answer".to_string())),
    ])]));
    let engine = engine_with(Arc::clone(&transport), Arc::clone(&backend));
    engine.open_conversation("c1").await.unwrap();
    backend.remove_canonical("c1");

    // Retry the second assistant message (index 3)
    engine.retry_from(3).await.unwrap();

    let messages = engine.transcript_snapshot().await;
    assert_eq!(messages.len(), 4);
    // First turn untouched
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[1].id, "m2");
    // Second turn replaced by a fresh local pair
    assert!(messages[2].has_local_id());
    assert_eq!(messages[2].role, ChatRole::User);
    assert_eq!(messages[2].content, "second question");
    assert!(messages[3].has_local_id());
    assert_eq!(messages[3].content, "retried answer");
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test]
async fn test_retry_from_first_turn_truncates_everything_after() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_canonical(two_turn_conversation("c1"));
    let transport = Arc::new(FakeTransport::new(vec![ScriptedOpen::Events(vec![
        Ok(StreamEvent::Done("fresh first answer".to_string())),
    ])]));
    let engine = engine_with(transport, Arc::clone(&backend));
    engine.open_conversation("c1").await.unwrap();
    backend.remove_canonical("c1");

    // Retrying the first assistant answer discards the second turn entirely
    engine.retry_from(1).await.unwrap();

    let messages = engine.transcript_snapshot().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first question");
    assert_eq!(messages[1].content, "fresh first answer");
}

#[tokio::test]
async fn test_retry_without_preceding_user_message_is_a_no_op() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_canonical(Conversation {
        id: "c1".to_string(),
        title: "Research".to_string(),
        messages: vec![server_message("m1", ChatRole::Assistant, "greeting")],
    });
    let transport = Arc::new(FakeTransport::new(vec![]));
    let engine = engine_with(Arc::clone(&transport), Arc::clone(&backend));
    engine.open_conversation("c1").await.unwrap();

    engine.retry_from(0).await.unwrap();
    engine.retry_from(10).await.unwrap();

    assert_eq!(transport.open_count(), 0);
    assert_eq!(engine.transcript_snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_retry_is_rejected_while_turn_in_flight() {
    let (tx, rx) = mpsc::unbounded_channel();
    let backend = Arc::new(FakeBackend::new());
    backend.set_canonical(two_turn_conversation("c1"));
    let transport = Arc::new(FakeTransport::new(vec![ScriptedOpen::Channel(rx)]));
    let engine = Arc::new(engine_with(Arc::clone(&transport), Arc::clone(&backend)));
    engine.open_conversation("c1").await.unwrap();
    backend.remove_canonical("c1");

    let running = Arc::clone(&engine);
    let turn = tokio::spawn(async move { running.send_turn("third question").await });
    settle().await;

    engine.retry_from(1).await.unwrap();
    // Nothing truncated, no second stream
    assert_eq!(transport.open_count(), 1);
    assert_eq!(engine.transcript_snapshot().await.len(), 6);

    tx.send(Ok(StreamEvent::Done("third answer".to_string())))
        .unwrap();
    drop(tx);
    turn.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_rejected_retry_performs_no_truncation() {
    let (tx, rx) = mpsc::unbounded_channel();
    let backend = Arc::new(FakeBackend::new());
    backend.set_canonical(two_turn_conversation("c1"));
    let transport = Arc::new(FakeTransport::new(vec![ScriptedOpen::Channel(rx)]));
    let engine = Arc::new(engine_with(Arc::clone(&transport), Arc::clone(&backend)));
    engine.open_conversation("c1").await.unwrap();
    backend.remove_canonical("c1");

    let running = Arc::clone(&engine);
    let turn = tokio::spawn(async move { running.retry_from(3).await });
    settle().await;
    // First retry truncated the second pair and appended a fresh one
    assert_eq!(engine.transcript_snapshot().await.len(), 4);

    // A retry rejected mid-turn must not truncate anything either
    engine.retry_from(1).await.unwrap();
    let messages = engine.transcript_snapshot().await;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[1].id, "m2");
    assert_eq!(transport.open_count(), 1);

    tx.send(Ok(StreamEvent::Done("retried answer".to_string())))
        .unwrap();
    drop(tx);
    turn.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_resend_does_not_duplicate_user_message() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_canonical(Conversation {
        id: "c1".to_string(),
        title: "Research".to_string(),
        messages: vec![server_message("m1", ChatRole::User, "orphaned question")],
    });
    let transport = Arc::new(FakeTransport::new(vec![ScriptedOpen::Events(vec![
        Ok(StreamEvent::Done("late answer".to_string())),
    ])]));
    let engine = engine_with(transport, Arc::clone(&backend));
    engine.open_conversation("c1").await.unwrap();
    backend.remove_canonical("c1");

    engine.resend_turn("orphaned question").await.unwrap();

    let messages = engine.transcript_snapshot().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].content, "late answer");
}

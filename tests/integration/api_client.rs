//! REST client tests against a wiremock server

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shoot_client::client::api::dto::{MarkReadRequest, SendMessageRequest};
use shoot_client::client::api::{ApiClient, MessageApi};
use shoot_client::client::auth::TokenManager;
use shoot_client::client::store::MemoryStore;
use shoot_client::client::Config;
use shoot_client::shared::config::AppConfigBuilder;
use shoot_client::shared::error::{AuthError, ChatError, NetworkError, ShootError};
use shoot_client::shared::message::{Message, MessageStatus};

use crate::common::*;

async fn client_for(server: &MockServer, builder: AppConfigBuilder) -> ApiClient {
    let config = Config::with_builder(
        builder
            .server_url(format!("{}/api/v1", server.uri()))
            .ws_url("ws://chat.test"),
    )
    .unwrap();
    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(TokenManager::open(store.clone()).await.unwrap());
    tokens.save_access_token(TOKEN).await.unwrap();
    ApiClient::new(config, tokens, store).unwrap()
}

async fn client(server: &MockServer) -> ApiClient {
    client_for(server, AppConfigBuilder::default()).await
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({ "success": true, "data": data })
}

#[tokio::test]
async fn test_get_messages_sends_paging_and_bearer() {
    let server = MockServer::start().await;
    let message = server_message("m1", FRIEND, "hello", 30);
    Mock::given(method("GET"))
        .and(path("/api/v1/chat-rooms/42/messages"))
        .and(query_param("page", "1"))
        .and(query_param("size", "20"))
        .and(query_param("cursor", "c-1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "messages": [message],
            "hasMore": true,
            "nextCursor": "c-2"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server).await.get_messages(ROOM, 1, 20, Some("c-1")).await.unwrap();
    assert_eq!(page.messages, vec![message]);
    assert!(page.has_more);
    assert_eq!(page.next_cursor.as_deref(), Some("c-2"));
}

#[tokio::test]
async fn test_send_message_keeps_temp_id() {
    let server = MockServer::start().await;
    let mut saved = server_message("m5", ME, "hi", 0);
    saved.temp_id = None;
    Mock::given(method("POST"))
        .and(path("/api/v1/messages"))
        .and(body_partial_json(json!({ "tempId": "temp_abc", "roomId": 42 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!(saved))))
        .mount(&server)
        .await;

    let request = SendMessageRequest::from_message(&Message::optimistic("temp_abc".into(), ROOM, ME, "hi"));
    let message = client(&server).await.send_message(&request).await.unwrap();
    assert_eq!(message.id, "m5");
    assert_eq!(message.temp_id.as_deref(), Some("temp_abc"));
    assert_eq!(message.status, MessageStatus::Saved);
}

#[tokio::test]
async fn test_mark_as_read_accepts_null_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/messages/read"))
        .and(body_partial_json(json!({ "messageIds": ["m1", "m2"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    let request = MarkReadRequest {
        room_id: ROOM,
        user_id: ME,
        message_ids: vec!["m1".into(), "m2".into()],
    };
    client(&server).await.mark_as_read(&request).await.unwrap();
}

#[tokio::test]
async fn test_search_passes_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/chat-rooms/42/messages/search"))
        .and(query_param("query", "lunch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({ "messages": [] }))))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server).await.search_messages(ROOM, "lunch", 0, 50).await.unwrap();
    assert!(page.messages.is_empty());
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_http_failures_map_to_errors() {
    let server = MockServer::start().await;
    Mock::given(path("/api/v1/chat-rooms/1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/chat-rooms/2/messages"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/chat-rooms/3/messages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "no such room",
            "errorCode": "ROOM_NOT_FOUND"
        })))
        .mount(&server)
        .await;

    let api = client(&server).await;
    let err = api.get_messages(1, 0, 20, None).await.unwrap_err();
    assert_matches!(err, ShootError::Network(NetworkError::Server { code: 500, message }) if message == "boom");

    let err = api.get_messages(2, 0, 20, None).await.unwrap_err();
    assert_eq!(err, ShootError::Auth(AuthError::Unauthorized));

    let err = api.get_messages(3, 0, 20, None).await.unwrap_err();
    assert_eq!(err, ShootError::Chat(ChatError::RoomNotFound));
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/messages/edit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "not yours",
            "errorCode": "MESSAGE_NOT_FOUND"
        })))
        .mount(&server)
        .await;

    let request = shoot_client::client::api::dto::EditMessageRequest {
        message_id: "m1".into(),
        new_content: "x".into(),
        user_id: ME,
    };
    let err = client(&server).await.edit_message(&request).await.unwrap_err();
    assert_eq!(err, ShootError::Chat(ChatError::MessageNotFound));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({ "messages": [] })))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let api = client_for(&server, AppConfigBuilder::default().request_timeout(Duration::from_millis(100))).await;
    let err = api.get_messages(ROOM, 0, 20, None).await.unwrap_err();
    assert_eq!(err, ShootError::Network(NetworkError::Timeout));
}

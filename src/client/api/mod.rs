//! # REST API Client
//!
//! `reqwest` client for the chat backend. Every response arrives in a
//! [`dto::ResponseDto`] envelope; HTTP status failures and `success == false`
//! envelopes are both translated into [`ShootError`] here and nowhere else.
//!
//! [`ApiClient`] implements [`MessageApi`] for the chat session and
//! [`SyncBackend`] for the sync manager.

pub mod dto;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::client::auth::TokenManager;
use crate::client::config::Config;
use crate::client::store::{self, DurableStore};
use crate::client::sync::{SyncBackend, SyncEntityType};
use crate::shared::error::{Result, ShootError, ValidationError};
use crate::shared::message::Message;

use dto::{
    DeleteMessageRequest, EditMessageRequest, MarkReadRequest, MessagePage, ReactionRequest, ResponseDto,
    SendMessageRequest,
};

/// Durable-store namespace of pulled sync snapshots
pub const SNAPSHOT_NAMESPACE: &str = "snapshot";

/// Message endpoints used by the chat session
#[async_trait]
pub trait MessageApi: Send + Sync {
    /// One page of room history, newest page first
    async fn get_messages(&self, room_id: i64, page: u32, size: u32, cursor: Option<&str>) -> Result<MessagePage>;

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message>;

    async fn edit_message(&self, request: &EditMessageRequest) -> Result<Message>;

    async fn delete_message(&self, request: &DeleteMessageRequest) -> Result<Message>;

    async fn mark_as_read(&self, request: &MarkReadRequest) -> Result<()>;

    async fn toggle_reaction(&self, request: &ReactionRequest) -> Result<Message>;

    async fn search_messages(&self, room_id: i64, query: &str, page: u32, size: u32) -> Result<MessagePage>;
}

/// REST client
pub struct ApiClient {
    http: Client,
    config: Config,
    tokens: Arc<TokenManager>,
    store: Arc<dyn DurableStore>,
}

impl ApiClient {
    pub fn new(config: Config, tokens: Arc<TokenManager>, store: Arc<dyn DurableStore>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.app().connect_timeout)
            .timeout(config.app().request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            tokens,
            store,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Last snapshot pulled for `entity_type`
    pub async fn snapshot(&self, entity_type: SyncEntityType) -> Result<Option<serde_json::Value>> {
        store::get_json(self.store.as_ref(), SNAPSHOT_NAMESPACE, entity_type.as_str()).await
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!("[API] {} {}", method, path);
        let builder = self.http.request(method, self.config.api_url(path));
        match self.tokens.access_token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send `builder` and unwrap the envelope
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Option<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let envelope = serde_json::from_str::<ResponseDto<serde_json::Value>>(&body).ok();
            let err = match envelope {
                Some(envelope) if envelope.error_code.is_some() => envelope.into_error(),
                Some(envelope) => ShootError::from_status(status.as_u16(), envelope.message),
                None => ShootError::from_status(status.as_u16(), Some(body).filter(|b| !b.is_empty())),
            };
            tracing::warn!("[API] Request failed with {}: {}", status, err);
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(None);
        }
        let envelope: ResponseDto<T> = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(envelope.into_error());
        }
        Ok(envelope.data)
    }

    async fn execute_data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        self.execute(builder)
            .await?
            .ok_or_else(|| ShootError::unknown("response carried no data"))
    }

    async fn push(&self, method: Method, path: &str, payload: &str) -> Result<()> {
        let body: serde_json::Value = serde_json::from_str(payload)
            .map_err(|_| ValidationError::InvalidFormat("payload".into()))?;
        let builder = self.request(method, path).await.json(&body);
        self.execute::<serde_json::Value>(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageApi for ApiClient {
    async fn get_messages(&self, room_id: i64, page: u32, size: u32, cursor: Option<&str>) -> Result<MessagePage> {
        let mut query = vec![("page", page.to_string()), ("size", size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        let builder = self
            .request(Method::GET, &format!("/chat-rooms/{room_id}/messages"))
            .await
            .query(&query);
        Ok(self.execute(builder).await?.unwrap_or_default())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        let builder = self.request(Method::POST, "/messages").await.json(request);
        let mut message: Message = self.execute_data(builder).await?;
        if message.temp_id.is_none() {
            message.temp_id = Some(request.temp_id.clone());
        }
        Ok(message)
    }

    async fn edit_message(&self, request: &EditMessageRequest) -> Result<Message> {
        let builder = self.request(Method::PUT, "/messages/edit").await.json(request);
        self.execute_data(builder).await
    }

    async fn delete_message(&self, request: &DeleteMessageRequest) -> Result<Message> {
        let builder = self.request(Method::DELETE, "/messages/delete").await.json(request);
        self.execute_data(builder).await
    }

    async fn mark_as_read(&self, request: &MarkReadRequest) -> Result<()> {
        let builder = self.request(Method::POST, "/messages/read").await.json(request);
        self.execute::<serde_json::Value>(builder).await?;
        Ok(())
    }

    async fn toggle_reaction(&self, request: &ReactionRequest) -> Result<Message> {
        let builder = self.request(Method::POST, "/messages/reactions").await.json(request);
        self.execute_data(builder).await
    }

    async fn search_messages(&self, room_id: i64, query: &str, page: u32, size: u32) -> Result<MessagePage> {
        let params = [
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("size", size.to_string()),
        ];
        let builder = self
            .request(Method::GET, &format!("/chat-rooms/{room_id}/messages/search"))
            .await
            .query(&params);
        Ok(self.execute(builder).await?.unwrap_or_default())
    }
}

/// Collection endpoint of a sync category
pub fn sync_collection(entity_type: SyncEntityType) -> &'static str {
    match entity_type {
        SyncEntityType::Message => "/messages",
        SyncEntityType::ChatRoom => "/chatrooms",
        SyncEntityType::Friend => "/friends",
        SyncEntityType::UserProfile => "/users/me",
        SyncEntityType::Settings => "/users/me/settings",
    }
}

/// Path of one entity; singleton categories have no id segment
pub fn sync_entity_path(entity_type: SyncEntityType, entity_id: &str) -> String {
    match entity_type {
        SyncEntityType::UserProfile | SyncEntityType::Settings => sync_collection(entity_type).to_string(),
        _ => format!("{}/{}", sync_collection(entity_type), entity_id),
    }
}

#[async_trait]
impl SyncBackend for ApiClient {
    async fn create(&self, entity_type: SyncEntityType, _entity_id: &str, payload: &str) -> Result<()> {
        self.push(Method::POST, sync_collection(entity_type), payload).await
    }

    async fn update(&self, entity_type: SyncEntityType, entity_id: &str, payload: &str) -> Result<()> {
        self.push(Method::PUT, &sync_entity_path(entity_type, entity_id), payload)
            .await
    }

    async fn delete(&self, entity_type: SyncEntityType, entity_id: &str) -> Result<()> {
        let builder = self
            .request(Method::DELETE, &sync_entity_path(entity_type, entity_id))
            .await
            .header(CONTENT_TYPE, "application/json");
        self.execute::<serde_json::Value>(builder).await?;
        Ok(())
    }

    async fn pull(&self, entity_type: SyncEntityType, since: Option<DateTime<Utc>>) -> Result<()> {
        let mut builder = self.request(Method::GET, sync_collection(entity_type)).await;
        if let Some(since) = since {
            builder = builder.query(&[("since", since.to_rfc3339())]);
        }
        let data: serde_json::Value = self.execute(builder).await?.unwrap_or(serde_json::Value::Null);
        let data = match since {
            Some(_) => merge_snapshot(self.snapshot(entity_type).await?, data),
            None => data,
        };
        store::put_json(self.store.as_ref(), SNAPSHOT_NAMESPACE, entity_type.as_str(), &data).await
    }
}

/// Fold an incremental pull into the stored snapshot
///
/// Array items are matched on `"id"`: a delta item replaces the stored item
/// with the same id and is appended otherwise. Anything that is not a pair of
/// arrays is replaced by the delta.
pub fn merge_snapshot(existing: Option<serde_json::Value>, delta: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match (existing, delta) {
        (Some(Value::Array(mut items)), Value::Array(changes)) => {
            for change in changes {
                let position = change
                    .get("id")
                    .and_then(|id| items.iter().position(|item| item.get("id") == Some(id)));
                match position {
                    Some(i) => items[i] = change,
                    None => items.push(change),
                }
            }
            Value::Array(items)
        }
        (_, delta) => delta,
    }
}

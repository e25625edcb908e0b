//! Builders for sessions wired to in-memory collaborators

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use shoot_client::client::auth::TokenManager;
use shoot_client::client::chat::ChatDeps;
use shoot_client::client::offline::{OfflineMessageQueue, RetryPolicy};
use shoot_client::client::store::MemoryStore;
use shoot_client::client::transport::{MemoryConnector, StompConnection};
use shoot_client::client::Config;
use shoot_client::shared::config::AppConfigBuilder;
use shoot_client::shared::message::{Message, MessageStatus};

use super::fakes::FakeMessageApi;

pub const ROOM: i64 = 42;
pub const ME: i64 = 7;
pub const FRIEND: i64 = 8;
pub const TOKEN: &str = "test-token";

pub fn test_config(builder: AppConfigBuilder) -> Config {
    Config::with_builder(
        builder
            .ws_url("ws://chat.test")
            .server_url("http://chat.test/api/v1")
            .request_timeout(Duration::from_secs(2))
            .connect_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

/// Server-confirmed message created `seconds_ago`
pub fn server_message(id: &str, sender_id: i64, text: &str, seconds_ago: i64) -> Message {
    let mut message = Message::optimistic(id.to_string(), ROOM, sender_id, text);
    message.temp_id = None;
    message.status = MessageStatus::Saved;
    message.created_at = Utc::now() - chrono::Duration::seconds(seconds_ago);
    message
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub connector: Arc<MemoryConnector>,
    pub connection: Arc<StompConnection>,
    pub api: Arc<FakeMessageApi>,
    pub queue: Arc<OfflineMessageQueue>,
    pub tokens: Arc<TokenManager>,
    pub config: Config,
}

impl Harness {
    pub async fn new(api: FakeMessageApi) -> Self {
        Self::with_config(api, test_config(AppConfigBuilder::default().auto_reconnect(false))).await
    }

    pub async fn with_config(api: FakeMessageApi, config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let connector = MemoryConnector::new();
        let connection = Arc::new(StompConnection::from_config(&config, connector.clone()));
        let queue = Arc::new(
            OfflineMessageQueue::open(store.clone(), RetryPolicy::default())
                .await
                .unwrap(),
        );
        let tokens = Arc::new(TokenManager::open(store.clone()).await.unwrap());
        tokens.save_access_token(TOKEN).await.unwrap();

        Self {
            store,
            connector,
            connection,
            api: Arc::new(api),
            queue,
            tokens,
            config,
        }
    }

    pub fn deps(&self) -> ChatDeps {
        ChatDeps {
            config: self.config.clone(),
            connection: self.connection.clone(),
            api: self.api.clone(),
            queue: self.queue.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

//! Shoot Client - Main Library
//!
//! Client-side message delivery and connection-resilience core of the Shoot
//! chat client. It talks to the chat backend over REST (JSON, bearer token)
//! and a WebSocket carrying STOMP frames, and keeps messages flowing while
//! the network comes and goes.
//!
//! # Module Structure
//!
//! - **`shared`** - data model, errors, configuration
//! - **`client`** - transport, offline queue, sync manager, chat session,
//!   REST client, token and durable storage
//! - **`logging`** - `tracing` subscriber setup
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shoot_client::client::api::ApiClient;
//! use shoot_client::client::auth::TokenManager;
//! use shoot_client::client::chat::{ChatDeps, ChatSession};
//! use shoot_client::client::offline::OfflineMessageQueue;
//! use shoot_client::client::store::{DurableStore, SqliteStore};
//! use shoot_client::client::transport::{StompConnection, TungsteniteConnector};
//! use shoot_client::client::Config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let store: Arc<dyn DurableStore> = Arc::new(SqliteStore::open(&config.database_path()).await?);
//! let tokens = Arc::new(TokenManager::open(store.clone()).await?);
//! let api = Arc::new(ApiClient::new(config.clone(), tokens.clone(), store.clone())?);
//! let queue = Arc::new(OfflineMessageQueue::open(store.clone(), config.app().retry).await?);
//! let connection = Arc::new(StompConnection::from_config(&config, Arc::new(TungsteniteConnector)));
//!
//! let deps = ChatDeps { config, connection, api, queue, tokens };
//! let session = ChatSession::open(deps, 42, 7).await?;
//! session.send_message("Hello!").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Every component is `Send + Sync` and shared through `Arc`. Observable
//! state lives in `tokio::sync::watch` cells with a single writer.

/// Shared types and data structures
pub mod shared;

/// Chat client core
pub mod client;

/// Logging setup
pub mod logging;

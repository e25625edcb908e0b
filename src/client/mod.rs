//! Client Module
//!
//! Message delivery and connection-resilience core of the Shoot chat client.
//!
//! # Module Structure
//!
//! - **`transport`** - STOMP frames over a WebSocket session
//! - **`offline`** - durable queue of undelivered messages, retry policy
//! - **`sync`** - push/pull synchronization of local data
//! - **`chat`** - one open chat room
//! - **`api`** - REST client
//! - **`auth`** - persisted tokens
//! - **`store`** - durable key-value persistence
//! - **`config`** - URL helpers over [`crate::shared::config::AppConfig`]

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod offline;
pub mod store;
pub mod sync;
pub mod transport;

pub use config::Config;

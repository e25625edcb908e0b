//! Shared Module
//!
//! Data model, error taxonomy and configuration used by every client
//! component. All wire types serialize to the camelCase JSON the chat
//! backend speaks.

/// Message data structures
pub mod message;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::{Result, ShootError};
pub use message::{Message, PendingMessage};

//! # Sync State
//!
//! State, operation and report types of the sync manager.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::offline::retry::RetryPolicy;

/// State of one sync manager
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Success { at: DateTime<Utc> },
    Error { message: String, at: DateTime<Utc> },
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing)
    }
}

/// Category of synchronized data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncEntityType {
    Message,
    ChatRoom,
    Friend,
    UserProfile,
    Settings,
}

impl SyncEntityType {
    /// Pull order of a full sync
    pub const ALL: [SyncEntityType; 5] = [
        Self::Message,
        Self::ChatRoom,
        Self::Friend,
        Self::UserProfile,
        Self::Settings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::ChatRoom => "CHAT_ROOM",
            Self::Friend => "FRIEND",
            Self::UserProfile => "USER_PROFILE",
            Self::Settings => "SETTINGS",
        }
    }
}

impl fmt::Display for SyncEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOperationType {
    Create,
    Update,
    Delete,
}

/// A local mutation waiting to be pushed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncOperation {
    pub id: String,
    pub entity_type: SyncEntityType,
    pub operation: SyncOperationType,
    pub entity_id: String,
    /// Serialized JSON
    pub payload: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    /// Per-operation ceiling; the manager's retry policy applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl PendingSyncOperation {
    pub fn new(
        entity_type: SyncEntityType,
        operation: SyncOperationType,
        entity_id: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entity_type,
            operation,
            entity_id: entity_id.into(),
            payload: payload.into(),
            created_at: Utc::now(),
            retry_count: 0,
            max_retries: None,
            last_attempt_at: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Retry ceiling under `policy`
    pub fn ceiling(&self, policy: &RetryPolicy) -> u32 {
        self.max_retries.unwrap_or(policy.max_attempts)
    }
}

/// An operation dropped after exhausting its retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub operation: PendingSyncOperation,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Counters of one push pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushSummary {
    pub pushed: usize,
    pub retried: usize,
    pub dead_lettered: usize,
    /// Operations still inside their backoff delay
    pub skipped: usize,
}

/// Result of a full sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub push: PushSummary,
    /// Set when the push phase itself failed
    pub push_error: Option<String>,
    pub synced: Vec<SyncEntityType>,
    /// Categories not pulled because local changes are still unpushed
    pub deferred: Vec<SyncEntityType>,
    pub failed: Vec<(SyncEntityType, String)>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.push_error.is_none() && self.failed.is_empty()
    }

    /// Aggregated failure message
    pub fn error_message(&self) -> Option<String> {
        if self.is_success() {
            return None;
        }
        let mut parts: Vec<String> = Vec::new();
        if let Some(error) = &self.push_error {
            parts.push(format!("push: {error}"));
        }
        parts.extend(self.failed.iter().map(|(entity, error)| format!("{entity}: {error}")));
        Some(parts.join("; "))
    }
}

/// Outcome of [`super::SyncManager::sync_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A pass was already running; nothing happened
    AlreadyRunning,
    Completed(SyncReport),
}

//! Message Data Structures
//!
//! Chat messages as the server reports them, plus the locally queued
//! [`PendingMessage`] that stands in for a message until the server confirms
//! delivery.
//!
//! Wire enums decode leniently: an unknown [`MessageType`] becomes `Text`
//! and an unknown [`MessageStatus`] becomes `Sending`, so a newer server
//! never breaks an older client.
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of locally generated message ids
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Generate a fresh temporary id (`temp_<uuid>`)
pub fn new_temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

/// Whether an id was generated locally and has no server counterpart yet
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Kind of message payload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    File,
    Voice,
}

impl MessageType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
            Self::Audio => "AUDIO",
            Self::File => "FILE",
            Self::Voice => "VOICE",
        }
    }
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "IMAGE" => Self::Image,
            "VIDEO" => Self::Video,
            "AUDIO" => Self::Audio,
            "FILE" => Self::File,
            "VOICE" => Self::Voice,
            _ => Self::Text,
        }
    }
}

/// Server-side delivery status of a message
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum MessageStatus {
    /// Sent by the client, not yet acknowledged
    #[default]
    Sending,
    /// Accepted by the broker
    SentToKafka,
    /// Being processed by the server
    Processing,
    /// Persisted by the server
    Saved,
    /// Delivery failed
    Failed,
}

impl From<String> for MessageStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "SENT_TO_KAFKA" => Self::SentToKafka,
            "PROCESSING" => Self::Processing,
            "SAVED" => Self::Saved,
            "FAILED" => Self::Failed,
            _ => Self::Sending,
        }
    }
}

/// File attached to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Link preview rendered under a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UrlPreview {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
}

/// Message body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub text: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_preview: Option<UrlPreview>,
}

impl MessageContent {
    /// Plain text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            message_type: MessageType::Text,
            attachments: Vec::new(),
            is_edited: false,
            is_deleted: false,
            url_preview: None,
        }
    }
}

/// A chat message
///
/// `temp_id` links an optimistic local entry to the server-confirmed
/// message that replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: MessageContent,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
    /// Reaction kind to the users who reacted with it
    #[serde(default)]
    pub reactions: BTreeMap<String, BTreeSet<i64>>,
    #[serde(default)]
    pub mentions: Vec<i64>,
    #[serde(default)]
    pub read_by: BTreeSet<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
}

impl Message {
    /// Optimistic text message shown before the server confirms it
    pub fn optimistic(temp_id: String, room_id: i64, sender_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: temp_id.clone(),
            room_id,
            sender_id,
            content: MessageContent::text(text),
            status: MessageStatus::Sending,
            thread_id: None,
            reply_to_message_id: None,
            reactions: BTreeMap::new(),
            mentions: Vec::new(),
            read_by: BTreeSet::new(),
            created_at: Utc::now(),
            updated_at: None,
            temp_id: Some(temp_id),
        }
    }

    /// Whether this entry has no server-assigned id yet
    pub fn is_temporary(&self) -> bool {
        is_temp_id(&self.id)
    }

    /// Whether `other` is the same logical message (by temp id or id)
    pub fn matches(&self, other: &Message) -> bool {
        if let (Some(mine), Some(theirs)) = (&self.temp_id, &other.temp_id) {
            if mine == theirs {
                return true;
            }
        }
        if let Some(theirs) = &other.temp_id {
            if &self.id == theirs {
                return true;
            }
        }
        self.id == other.id
    }
}

/// Lifecycle of an entry in the offline queue
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    #[default]
    Pending,
    Sending,
    Sent,
    Failed,
}

/// A message waiting in the offline queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingMessage {
    pub id: String,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachment_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: QueueStatus,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingMessage {
    /// New pending text message
    pub fn new(id: impl Into<String>, room_id: i64, sender_id: i64, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            room_id,
            sender_id,
            content: content.into(),
            message_type: MessageType::Text,
            attachment_ids: Vec::new(),
            reply_to_message_id: None,
            created_at: Utc::now(),
            status: QueueStatus::Pending,
            retry_count: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    /// Render as an optimistic message; the queue id becomes both `id` and `temp_id`
    pub fn to_message(&self) -> Message {
        let status = match self.status {
            QueueStatus::Pending | QueueStatus::Sending => MessageStatus::Sending,
            QueueStatus::Sent => MessageStatus::SentToKafka,
            QueueStatus::Failed => MessageStatus::Failed,
        };
        Message {
            id: self.id.clone(),
            room_id: self.room_id,
            sender_id: self.sender_id,
            content: MessageContent {
                message_type: self.message_type,
                ..MessageContent::text(self.content.clone())
            },
            status,
            thread_id: None,
            reply_to_message_id: self.reply_to_message_id.clone(),
            reactions: BTreeMap::new(),
            mentions: Vec::new(),
            read_by: BTreeSet::new(),
            created_at: self.created_at,
            updated_at: None,
            temp_id: Some(self.id.clone()),
        }
    }

    /// Stage a message for the queue, keyed by its temp id when it has one
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.temp_id.clone().unwrap_or_else(|| message.id.clone()),
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: message.content.text.clone(),
            message_type: message.content.message_type,
            attachment_ids: message.content.attachments.iter().map(|a| a.id.clone()).collect(),
            reply_to_message_id: message.reply_to_message_id.clone(),
            created_at: message.created_at,
            status: QueueStatus::Pending,
            retry_count: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }
}

/// Status change pushed by the server for a message in the room topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusUpdate {
    #[serde(default)]
    pub temp_id: Option<String>,
    pub message_id: String,
    pub status: MessageStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

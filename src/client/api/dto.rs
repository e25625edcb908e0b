//! Wire types of the REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::{AuthError, ChatError, FriendError, ShootError};
use crate::shared::message::{Attachment, Message, MessageType, PendingMessage};

/// Envelope around every REST response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDto<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub code: Option<u16>,
}

impl<T> ResponseDto<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error_code: None,
            timestamp: None,
            code: None,
        }
    }

    /// Error for an envelope with `success == false`
    pub fn into_error(self) -> ShootError {
        let fallback = || ShootError::unknown(self.message.clone().unwrap_or_else(|| "request failed".into()));
        match self.error_code.as_deref() {
            Some("ROOM_NOT_FOUND") => ChatError::RoomNotFound.into(),
            Some("MESSAGE_NOT_FOUND") => ChatError::MessageNotFound.into(),
            Some("NOT_PARTICIPANT") => ChatError::NotParticipant.into(),
            Some("UNAUTHORIZED") => AuthError::Unauthorized.into(),
            Some("TOKEN_EXPIRED") => AuthError::TokenExpired.into(),
            Some("USER_NOT_FOUND") => AuthError::UserNotFound.into(),
            Some("ALREADY_FRIENDS") => FriendError::AlreadyFriends.into(),
            Some("USER_BLOCKED") => FriendError::UserBlocked.into(),
            _ => match self.code {
                Some(code) if code >= 400 => ShootError::from_status(code, self.message.clone()),
                _ => fallback(),
            },
        }
    }
}

/// One page of messages
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRequest {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub url: String,
}

impl From<&Attachment> for AttachmentRequest {
    fn from(attachment: &Attachment) -> Self {
        Self {
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            size: attachment.size,
            url: attachment.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageContentRequest {
    pub text: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachments: Vec<AttachmentRequest>,
    /// Previously uploaded files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment_ids: Vec<String>,
}

/// Body of `POST /messages` and of `/app/chat` frames
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub temp_id: String,
    pub room_id: i64,
    pub sender_id: i64,
    pub content: MessageContentRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
    #[serde(default)]
    pub mentions: Vec<i64>,
}

impl SendMessageRequest {
    pub fn from_message(message: &Message) -> Self {
        Self {
            temp_id: message.temp_id.clone().unwrap_or_else(|| message.id.clone()),
            room_id: message.room_id,
            sender_id: message.sender_id,
            content: MessageContentRequest {
                text: message.content.text.clone(),
                message_type: message.content.message_type,
                attachments: message.content.attachments.iter().map(AttachmentRequest::from).collect(),
                attachment_ids: Vec::new(),
            },
            thread_id: message.thread_id.clone(),
            reply_to_message_id: message.reply_to_message_id.clone(),
            mentions: message.mentions.clone(),
        }
    }

    pub fn from_pending(pending: &PendingMessage) -> Self {
        Self {
            temp_id: pending.id.clone(),
            room_id: pending.room_id,
            sender_id: pending.sender_id,
            content: MessageContentRequest {
                text: pending.content.clone(),
                message_type: pending.message_type,
                attachments: Vec::new(),
                attachment_ids: pending.attachment_ids.clone(),
            },
            thread_id: None,
            reply_to_message_id: pending.reply_to_message_id.clone(),
            mentions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub message_id: String,
    pub new_content: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    pub message_id: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub room_id: i64,
    pub user_id: i64,
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub message_id: String,
    pub user_id: i64,
    pub reaction_type: String,
}

/// Body of `/app/chat/typing` frames
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub room_id: i64,
    pub user_id: i64,
    pub is_typing: bool,
}

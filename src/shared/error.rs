//! Shared Error Types
//!
//! Every fallible operation in the crate returns [`Result`], whose error is a
//! [`ShootError`]. Failures coming from the outside world (HTTP, SQLite,
//! WebSocket, JSON) are translated exactly once, at the boundary where they
//! occur, into this taxonomy.
//!
//! # Error Categories
//!
//! - `Network` - connectivity, timeouts, server-side failures
//! - `Auth` - authentication and account errors
//! - `Validation` - field-level input errors
//! - `Chat` - room, message and realtime connection errors
//! - `Friend` - friend request errors
//! - `Storage` - local persistence errors
//! - `Cancelled` - the operation was cancelled and must not be retried
//! - `Unknown` - catch-all
//!
//! # Usage
//!
//! ```rust
//! use shoot_client::shared::error::{ShootError, NetworkError};
//!
//! let error = ShootError::from(NetworkError::Timeout);
//! assert!(error.is_retryable());
//! assert_eq!(error.user_message(), "The request timed out. Please try again");
//! ```
use thiserror::Error;

use crate::client::transport::frame::FrameError;

/// Result alias used across the crate
pub type Result<T, E = ShootError> = std::result::Result<T, E>;

/// Top-level error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShootError {
    /// Network failure
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Authentication failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Input validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Chat failure
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Friend failure
    #[error(transparent)]
    Friend(#[from] FriendError),

    /// Local storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Anything else
    #[error("{message}")]
    Unknown {
        /// Human-readable error message
        message: String,
    },
}

/// Network errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("no network connection")]
    NoConnection,
    #[error("request timed out")]
    Timeout,
    #[error("server error (code: {code}) - {message}")]
    Server { code: u16, message: String },
    #[error("network error: {0}")]
    Unknown(String),
}

/// Authentication errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token expired")]
    TokenExpired,
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
}

/// Field-level validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field '{0}' must not be empty")]
    EmptyField(String),
    #[error("field '{0}' has an invalid format")]
    InvalidFormat(String),
    #[error("validation error in field '{field}': {message}")]
    Field { field: String, message: String },
}

/// Chat errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("chat room not found")]
    RoomNotFound,
    #[error("message send failed: {0}")]
    SendFailed(String),
    #[error("message not found")]
    MessageNotFound,
    #[error("realtime connection failed: {0}")]
    ConnectionFailed(String),
    #[error("realtime connection is not established")]
    NotConnected,
    #[error("not a participant of this chat room")]
    NotParticipant,
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Friend errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FriendError {
    #[error("already friends")]
    AlreadyFriends,
    #[error("friend request already sent")]
    RequestAlreadySent,
    #[error("friend request not found")]
    RequestNotFound,
    #[error("user is blocked")]
    UserBlocked,
}

/// Local storage errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("stored record not found")]
    NotFound,
}

impl ShootError {
    /// Create a catch-all error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Create a field validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::Field {
            field: field.into(),
            message: message.into(),
        })
    }

    /// Whether this error is a cancellation signal
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(NetworkError::Server { code, .. }) => *code >= 500 || *code == 429,
            Self::Network(_) => true,
            Self::Chat(ChatError::ConnectionFailed(_))
            | Self::Chat(ChatError::NotConnected)
            | Self::Chat(ChatError::SendFailed(_)) => true,
            Self::Auth(AuthError::TokenExpired) => true,
            _ => false,
        }
    }

    /// Message suitable for display to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(NetworkError::NoConnection) => "Please check your internet connection".into(),
            Self::Network(NetworkError::Timeout) => "The request timed out. Please try again".into(),
            Self::Network(NetworkError::Server { .. }) => {
                "A server error occurred. Please try again later".into()
            }
            Self::Network(NetworkError::Unknown(_)) => "A network error occurred".into(),

            Self::Auth(AuthError::Unauthorized) => "Please sign in".into(),
            Self::Auth(AuthError::InvalidCredentials) => "Incorrect username or password".into(),
            Self::Auth(AuthError::TokenExpired) => "Your session expired. Please sign in again".into(),
            Self::Auth(AuthError::UserNotFound) => "User not found".into(),
            Self::Auth(AuthError::UserAlreadyExists) => "This user already exists".into(),

            Self::Validation(err) => err.to_string(),

            Self::Chat(ChatError::RoomNotFound) => "Chat room not found".into(),
            Self::Chat(ChatError::SendFailed(_)) => "Failed to send the message".into(),
            Self::Chat(ChatError::MessageNotFound) => "Message not found".into(),
            Self::Chat(ChatError::ConnectionFailed(_)) | Self::Chat(ChatError::NotConnected) => {
                "Realtime connection failed".into()
            }
            Self::Chat(ChatError::NotParticipant) => "You are not a participant of this chat room".into(),
            Self::Chat(ChatError::MalformedFrame(_)) => "Received an unreadable update".into(),

            Self::Friend(FriendError::AlreadyFriends) => "You are already friends".into(),
            Self::Friend(FriendError::RequestAlreadySent) => "Friend request already sent".into(),
            Self::Friend(FriendError::RequestNotFound) => "Friend request not found".into(),
            Self::Friend(FriendError::UserBlocked) => "This user is blocked".into(),

            Self::Storage(StorageError::ReadFailed(_)) => "Failed to read local data".into(),
            Self::Storage(StorageError::WriteFailed(_)) => "Failed to save local data".into(),
            Self::Storage(StorageError::NotFound) => "Local data not found".into(),

            Self::Cancelled => "The operation was cancelled".into(),
            Self::Unknown { message } => message.clone(),
        }
    }

    /// Translate an HTTP status and optional server message
    pub fn from_status(code: u16, message: Option<String>) -> Self {
        match code {
            401 | 403 => Self::Auth(AuthError::Unauthorized),
            400 => Self::Validation(ValidationError::InvalidFormat("request".into())),
            _ => Self::Network(NetworkError::Server {
                code,
                message: message.unwrap_or_default(),
            }),
        }
    }
}

impl From<reqwest::Error> for ShootError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return NetworkError::Timeout.into();
        }
        if err.is_connect() {
            return NetworkError::NoConnection.into();
        }
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), Some(err.to_string()));
        }
        if err.is_decode() {
            return Self::unknown(format!("invalid response body: {err}"));
        }
        NetworkError::Unknown(err.to_string()).into()
    }
}

impl From<sqlx::Error> for ShootError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound.into(),
            sqlx::Error::Decode(e) | sqlx::Error::ColumnDecode { source: e, .. } => {
                StorageError::ReadFailed(e.to_string()).into()
            }
            other => StorageError::WriteFailed(other.to_string()).into(),
        }
    }
}

impl From<serde_json::Error> for ShootError {
    fn from(err: serde_json::Error) -> Self {
        Self::unknown(format!("JSON error: {err}"))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ShootError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Io(e) => ChatError::ConnectionFailed(e.to_string()).into(),
            WsError::Http(response) => Self::from_status(response.status().as_u16(), None),
            WsError::ConnectionClosed | WsError::AlreadyClosed => ChatError::NotConnected.into(),
            other => ChatError::ConnectionFailed(other.to_string()).into(),
        }
    }
}

impl From<FrameError> for ShootError {
    fn from(err: FrameError) -> Self {
        ChatError::MalformedFrame(err.to_string()).into()
    }
}

impl From<tokio::time::error::Elapsed> for ShootError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        NetworkError::Timeout.into()
    }
}

//! # Chat Session
//!
//! Controller of one open chat room. It owns the visible message list and
//! keeps it consistent while messages travel over the realtime transport,
//! the REST fallback and the offline queue.
//!
//! ## Delivery Path
//!
//! 1. The message is shown immediately as `Sending` under a `temp_` id
//! 2. It is published to `/app/chat` over the transport
//! 3. If that fails it is posted to `POST /messages`
//! 4. If that fails too it is marked `Failed` and staged in the offline
//!    queue under the same temp id
//!
//! Confirmations from either path replace the optimistic entry in place, so
//! the list never holds two entries for one temp id.
//!
//! ## Observing
//!
//! The frontend renders from `watch` receivers: [`ChatSession::watch_messages`],
//! [`ChatSession::watch_error`], [`ChatSession::watch_search`] and
//! [`ChatSession::watch_typing`].

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Weak};

use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::search::{self, SearchState, SearchView};
use super::timeline;
use crate::client::api::dto::{
    DeleteMessageRequest, EditMessageRequest, MarkReadRequest, ReactionRequest, SendMessageRequest, TypingEvent,
};
use crate::client::api::MessageApi;
use crate::client::auth::TokenManager;
use crate::client::config::Config;
use crate::client::offline::{OfflineMessageQueue, ProcessOutcome, RetryPolicy};
use crate::client::transport::frame::{StompCommand, StompFrame};
use crate::client::transport::{ConnectionState, StompConnection};
use crate::shared::error::{AuthError, ChatError, Result, ValidationError};
use crate::shared::message::{
    is_temp_id, new_temp_id, Message, MessageStatus, MessageStatusUpdate, PendingMessage, QueueStatus,
};

pub const SEND_DESTINATION: &str = "/app/chat";
pub const TYPING_DESTINATION: &str = "/app/chat/typing";

/// Room topic carrying messages and status updates
pub fn room_topic(room_id: i64) -> String {
    format!("/topic/chat/{room_id}")
}

/// Collaborators of a session
#[derive(Clone)]
pub struct ChatDeps {
    pub config: Config,
    pub connection: Arc<StompConnection>,
    pub api: Arc<dyn MessageApi>,
    pub queue: Arc<OfflineMessageQueue>,
    pub tokens: Arc<TokenManager>,
}

/// How a message left the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Published over the transport; the server confirms later on the room topic
    Published,
    /// Accepted by the REST API
    Confirmed(Message),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoomEvent {
    Message(Box<Message>),
    Status(MessageStatusUpdate),
    Typing(TypingEvent),
}

#[derive(Debug, Default)]
struct HistoryCursor {
    next_page: u32,
    next_cursor: Option<String>,
    has_more: bool,
}

struct SessionInner {
    deps: ChatDeps,
    room_id: i64,
    user_id: i64,
    topic: String,
    messages: watch::Sender<Vec<Message>>,
    error: watch::Sender<Option<String>>,
    search: watch::Sender<SearchView>,
    typing: watch::Sender<BTreeSet<i64>>,
    history: Mutex<HistoryCursor>,
}

/// One open chat room
pub struct ChatSession {
    inner: Arc<SessionInner>,
    listener: JoinHandle<()>,
    supervisor: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Open `room_id` for `user_id`
    ///
    /// History and connection failures do not fail the open: the session
    /// starts with whatever it could load and the queued messages of the room.
    /// When the connection comes up the offline queue is flushed.
    pub async fn open(deps: ChatDeps, room_id: i64, user_id: i64) -> Result<Self> {
        let (messages, _) = watch::channel(Vec::new());
        let (error, _) = watch::channel(None);
        let (search, _) = watch::channel(SearchView::default());
        let (typing, _) = watch::channel(BTreeSet::new());
        let inner = Arc::new(SessionInner {
            topic: room_topic(room_id),
            deps,
            room_id,
            user_id,
            messages,
            error,
            search,
            typing,
            history: Mutex::new(HistoryCursor::default()),
        });

        tracing::info!("[CHAT] Opening room {} as user {}", room_id, user_id);

        if let Err(e) = inner.load_history().await {
            tracing::warn!("[CHAT] Failed to load history of room {}: {}", room_id, e);
            inner.error.send_replace(Some(e.user_message()));
        }
        inner.show_queued();
        inner.mark_history_read().await;

        let frames = inner.deps.connection.frames();
        let listener = tokio::spawn(run_listener(Arc::downgrade(&inner), frames));

        let may_connect = inner.deps.connection.is_connected() || inner.deps.tokens.access_token().await.is_some();
        if may_connect {
            match inner.connect_and_subscribe().await {
                Ok(()) => {
                    if let Err(e) = inner.flush_offline_queue().await {
                        tracing::warn!("[CHAT] Failed to flush offline queue of room {}: {}", room_id, e);
                    }
                }
                Err(e) => tracing::warn!("[CHAT] Realtime connection unavailable: {}", e),
            }
        }

        let app = inner.deps.config.app();
        let supervisor = app.auto_reconnect.then(|| {
            tokio::spawn(supervise(
                Arc::downgrade(&inner),
                inner.deps.connection.watch_state(),
                app.reconnect,
            ))
        });

        Ok(Self {
            inner,
            listener,
            supervisor,
        })
    }

    pub fn room_id(&self) -> i64 {
        self.inner.room_id
    }

    pub fn user_id(&self) -> i64 {
        self.inner.user_id
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages.borrow().clone()
    }

    pub fn watch_messages(&self) -> watch::Receiver<Vec<Message>> {
        self.inner.messages.subscribe()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.error.borrow().clone()
    }

    pub fn watch_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error.subscribe()
    }

    pub fn clear_error(&self) {
        self.inner.error.send_replace(None);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.deps.connection.state()
    }

    /// Other users currently typing in the room
    pub fn typing_users(&self) -> BTreeSet<i64> {
        self.inner.typing.borrow().clone()
    }

    pub fn watch_typing(&self) -> watch::Receiver<BTreeSet<i64>> {
        self.inner.typing.subscribe()
    }

    /// Send `text`, returning the temp id of the new entry
    ///
    /// Blank text is ignored. A delivery failure is not an error here: the
    /// entry is marked `Failed`, the error is exposed and the message is
    /// queued for later.
    pub async fn send_message(&self, text: &str) -> Result<Option<String>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let temp_id = new_temp_id();
        let message = Message::optimistic(temp_id.clone(), self.inner.room_id, self.inner.user_id, text);
        self.inner.messages.send_modify(|messages| messages.push(message.clone()));

        let request = SendMessageRequest::from_message(&message);
        match self.inner.deliver(&request).await {
            Ok(delivery) => self.inner.apply_delivery(&temp_id, delivery),
            Err(e) if e.is_cancellation() => {
                self.inner.deps.queue.enqueue(PendingMessage::from_message(&message)).await?;
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("[CHAT] Send of {} failed, queued for retry: {}", temp_id, e);
                self.inner.mark_failed(&temp_id, &e.user_message());
                self.inner.deps.queue.enqueue(PendingMessage::from_message(&message)).await?;
            }
        }
        Ok(Some(temp_id))
    }

    /// Resend a failed message under its original temp id
    ///
    /// Returns `false` without doing anything unless the message is a
    /// `Failed` message of this room not already being sent by the offline
    /// queue.
    pub async fn retry_message(&self, message: &Message) -> Result<bool> {
        if message.status != MessageStatus::Failed || message.room_id != self.inner.room_id {
            return Ok(false);
        }
        let temp_id = message.temp_id.clone().unwrap_or_else(|| message.id.clone());

        let queue = &self.inner.deps.queue;
        let claimed = match queue.get(&temp_id) {
            Some(_) => match queue.claim_for_retry(&temp_id).await? {
                Some(_) => true,
                None => return Ok(false),
            },
            None => false,
        };

        let current = {
            let messages = self.inner.messages.borrow();
            timeline::find(&messages, &temp_id).cloned()
        };
        let current = match current {
            Some(current) if current.status == MessageStatus::Failed => current,
            Some(_) => {
                if claimed {
                    queue.update_status(&temp_id, QueueStatus::Pending).await?;
                }
                return Ok(false);
            }
            None => message.clone(),
        };

        let sending = Message {
            status: MessageStatus::Sending,
            ..current.clone()
        };
        self.inner.messages.send_modify(|messages| timeline::upsert(messages, sending));

        let request = SendMessageRequest::from_message(&current);
        match self.inner.deliver(&request).await {
            Ok(delivery) => {
                if claimed {
                    queue.dequeue(&temp_id).await?;
                }
                self.inner.apply_delivery(&temp_id, delivery);
                tracing::info!("[CHAT] Retried {}", temp_id);
            }
            Err(e) if e.is_cancellation() => {
                if claimed {
                    queue.update_status(&temp_id, QueueStatus::Pending).await?;
                }
                self.inner.mark_failed(&temp_id, &e.user_message());
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("[CHAT] Retry of {} failed: {}", temp_id, e);
                self.inner.mark_failed(&temp_id, &e.user_message());
                if claimed {
                    queue.record_failure(&temp_id, &e).await?;
                } else {
                    queue.enqueue(PendingMessage::from_message(&current)).await?;
                }
            }
        }
        Ok(true)
    }

    /// Retry every failed message of the room
    pub async fn retry_failed(&self) -> Result<usize> {
        let failed: Vec<Message> = self
            .messages()
            .into_iter()
            .filter(|m| m.status == MessageStatus::Failed)
            .collect();
        let mut retried = 0;
        for message in &failed {
            if self.retry_message(message).await? {
                retried += 1;
            }
        }
        Ok(retried)
    }

    /// Deliver queued messages through the normal delivery path
    pub async fn flush_offline_queue(&self) -> Result<ProcessOutcome> {
        self.inner.flush_offline_queue().await
    }

    /// Connect, resubscribe and flush the offline queue
    pub async fn reconnect(&self) -> Result<ProcessOutcome> {
        self.inner.reconnect().await
    }

    /// Load the next older history page; returns the number of new entries
    pub async fn load_more_messages(&self) -> Result<usize> {
        self.inner.load_more().await
    }

    pub async fn edit_message(&self, message_id: &str, new_content: &str) -> Result<Message> {
        if new_content.trim().is_empty() {
            return Err(ValidationError::EmptyField("content".into()).into());
        }
        self.inner.ensure_server_id(message_id)?;
        let request = EditMessageRequest {
            message_id: message_id.to_string(),
            new_content: new_content.to_string(),
            user_id: self.inner.user_id,
        };
        let api = &self.inner.deps.api;
        let result = self.inner.bounded(api.edit_message(&request)).await;
        self.inner.apply_update(result, "edit")
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<Message> {
        self.inner.ensure_server_id(message_id)?;
        let request = DeleteMessageRequest {
            message_id: message_id.to_string(),
            user_id: self.inner.user_id,
        };
        let api = &self.inner.deps.api;
        let result = self.inner.bounded(api.delete_message(&request)).await;
        self.inner.apply_update(result, "delete")
    }

    pub async fn toggle_reaction(&self, message_id: &str, reaction_type: &str) -> Result<Message> {
        self.inner.ensure_server_id(message_id)?;
        let request = ReactionRequest {
            message_id: message_id.to_string(),
            user_id: self.inner.user_id,
            reaction_type: reaction_type.to_string(),
        };
        let api = &self.inner.deps.api;
        let result = self.inner.bounded(api.toggle_reaction(&request)).await;
        self.inner.apply_update(result, "reaction")
    }

    /// Publish a typing indicator; failures are only logged
    pub async fn send_typing(&self, is_typing: bool) {
        let event = TypingEvent {
            room_id: self.inner.room_id,
            user_id: self.inner.user_id,
            is_typing,
        };
        let body = match serde_json::to_string(&event) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("[CHAT] Failed to encode typing event: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .inner
            .deps
            .connection
            .send_to_destination(TYPING_DESTINATION, &body)
            .await
        {
            tracing::debug!("[CHAT] Failed to send typing event: {}", e);
        }
    }

    pub fn search(&self) -> SearchView {
        self.inner.search.borrow().clone()
    }

    pub fn watch_search(&self) -> watch::Receiver<SearchView> {
        self.inner.search.subscribe()
    }

    pub fn enter_search_mode(&self) {
        self.inner.search.send_modify(|view| view.active = true);
    }

    pub fn exit_search_mode(&self) {
        self.inner.search.send_replace(SearchView::default());
    }

    /// Search the room for `query`
    ///
    /// Queries shorter than two characters clear the results instead.
    pub async fn update_search_query(&self, query: &str) -> Result<()> {
        let query = query.to_string();
        self.inner.search.send_modify(|view| view.query = query.clone());

        if !search::is_searchable(&query) {
            self.inner.search.send_modify(SearchView::clear_results);
            return Ok(());
        }

        self.inner.search.send_modify(|view| view.state = SearchState::Searching);
        let api = &self.inner.deps.api;
        let size = self.inner.deps.config.app().search_page_size;
        let result = self
            .inner
            .bounded(api.search_messages(self.inner.room_id, query.trim(), 0, size))
            .await;

        match result {
            Ok(page) => {
                let mut results = page.messages;
                search::sort_newest_first(&mut results);
                tracing::debug!("[CHAT] Search '{}' found {} messages", query, results.len());
                self.inner.search.send_if_modified(|view| {
                    // a newer query owns the view
                    if view.query != query {
                        return false;
                    }
                    view.state = SearchState::Results(results.len());
                    view.results = results;
                    true
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[CHAT] Search failed: {}", e);
                self.inner.search.send_if_modified(|view| {
                    if view.query != query {
                        return false;
                    }
                    view.state = SearchState::Error(e.user_message());
                    true
                });
                Err(e)
            }
        }
    }

    /// Index of `message_id` in the visible list
    pub fn position_of(&self, message_id: &str) -> Option<usize> {
        timeline::position_of(&self.inner.messages.borrow(), message_id)
    }

    /// Stop background tasks and disconnect
    pub async fn close(&self) {
        self.listener.abort();
        if let Some(supervisor) = &self.supervisor {
            supervisor.abort();
        }
        self.inner.deps.connection.disconnect().await;
        tracing::info!("[CHAT] Closed room {}", self.inner.room_id);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.listener.abort();
        if let Some(supervisor) = &self.supervisor {
            supervisor.abort();
        }
    }
}

impl SessionInner {
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.deps.config.app().request_timeout, call).await?
    }

    async fn load_history(&self) -> Result<()> {
        let size = self.deps.config.app().history_page_size;
        let page = self
            .bounded(self.deps.api.get_messages(self.room_id, 0, size, None))
            .await?;

        let mut cursor = self.history.lock().await;
        cursor.next_page = 1;
        cursor.next_cursor = page.next_cursor;
        cursor.has_more = page.has_more;

        let mut history = page.messages;
        timeline::sort_by_created(&mut history);
        tracing::debug!("[CHAT] Loaded {} messages of room {}", history.len(), self.room_id);
        self.messages.send_modify(|messages| {
            for message in history {
                timeline::upsert(messages, message);
            }
            timeline::sort_by_created(messages);
        });
        Ok(())
    }

    async fn load_more(&self) -> Result<usize> {
        let mut cursor = self.history.lock().await;
        if !cursor.has_more {
            return Ok(0);
        }
        let size = self.deps.config.app().history_page_size;
        let page = self
            .bounded(
                self.deps
                    .api
                    .get_messages(self.room_id, cursor.next_page, size, cursor.next_cursor.as_deref()),
            )
            .await?;
        cursor.next_page += 1;
        cursor.next_cursor = page.next_cursor;
        cursor.has_more = page.has_more;

        let mut added = 0;
        self.messages.send_modify(|messages| {
            for message in page.messages {
                let before = messages.len();
                timeline::upsert(messages, message);
                added += messages.len().saturating_sub(before);
            }
            timeline::sort_by_created(messages);
        });
        Ok(added)
    }

    fn show_queued(&self) {
        let queued = self.deps.queue.pending_for_room(self.room_id);
        if queued.is_empty() {
            return;
        }
        tracing::debug!("[CHAT] Showing {} queued messages", queued.len());
        self.messages.send_modify(|messages| {
            for pending in &queued {
                timeline::upsert(messages, pending.to_message());
            }
        });
    }

    async fn mark_history_read(&self) {
        let unread = timeline::unread_ids(&self.messages.borrow(), self.user_id);
        if unread.is_empty() {
            return;
        }
        let request = MarkReadRequest {
            room_id: self.room_id,
            user_id: self.user_id,
            message_ids: unread,
        };
        match self.bounded(self.deps.api.mark_as_read(&request)).await {
            Ok(()) => {
                tracing::debug!("[CHAT] Marked {} messages as read", request.message_ids.len());
                self.messages
                    .send_modify(|messages| timeline::mark_read(messages, &request.message_ids, self.user_id));
            }
            Err(e) => tracing::warn!("[CHAT] Failed to mark messages as read: {}", e),
        }
    }

    async fn connect_and_subscribe(&self) -> Result<()> {
        let connection = &self.deps.connection;
        if !connection.is_connected() {
            let token = self
                .deps
                .tokens
                .access_token()
                .await
                .ok_or(AuthError::Unauthorized)?;
            connection.connect(&token).await?;
        }
        connection.subscribe(&self.topic).await?;
        Ok(())
    }

    async fn reconnect(&self) -> Result<ProcessOutcome> {
        self.connect_and_subscribe().await?;
        tracing::info!("[CHAT] Reconnected to room {}", self.room_id);
        self.flush_offline_queue().await
    }

    async fn flush_offline_queue(&self) -> Result<ProcessOutcome> {
        self.deps
            .queue
            .process_all(|pending| async move {
                self.messages
                    .send_modify(|messages| {
                        timeline::set_status(messages, &pending.id, MessageStatus::Sending);
                    });
                let request = SendMessageRequest::from_pending(&pending);
                match self.deliver(&request).await {
                    Ok(Delivery::Published) => {
                        self.apply_delivery(&pending.id, Delivery::Published);
                        let mut message = pending.to_message();
                        message.status = MessageStatus::SentToKafka;
                        Ok(message)
                    }
                    Ok(Delivery::Confirmed(message)) => {
                        self.apply_delivery(&pending.id, Delivery::Confirmed(message.clone()));
                        Ok(message)
                    }
                    Err(e) => {
                        if !e.is_cancellation() {
                            self.messages.send_modify(|messages| {
                                timeline::set_status(messages, &pending.id, MessageStatus::Failed);
                            });
                        }
                        Err(e)
                    }
                }
            })
            .await
    }

    /// Publish over the transport, falling back to REST
    async fn deliver(&self, request: &SendMessageRequest) -> Result<Delivery> {
        let body = serde_json::to_string(request)?;
        match self.deps.connection.send_to_destination(SEND_DESTINATION, &body).await {
            Ok(()) => return Ok(Delivery::Published),
            Err(e) => tracing::debug!("[CHAT] Transport send failed, falling back to REST: {}", e),
        }
        let message = self.bounded(self.deps.api.send_message(request)).await?;
        Ok(Delivery::Confirmed(message))
    }

    fn apply_delivery(&self, temp_id: &str, delivery: Delivery) {
        match delivery {
            Delivery::Published => {
                self.messages.send_if_modified(|messages| {
                    // a confirmation may already have arrived on the topic
                    match timeline::status_of(messages, temp_id) {
                        Some(MessageStatus::Sending) | Some(MessageStatus::Failed) => {
                            timeline::set_status(messages, temp_id, MessageStatus::SentToKafka)
                        }
                        _ => false,
                    }
                });
            }
            Delivery::Confirmed(mut message) => {
                if message.temp_id.is_none() {
                    message.temp_id = Some(temp_id.to_string());
                }
                if message.room_id == self.room_id {
                    self.messages.send_modify(|messages| timeline::upsert(messages, message));
                }
            }
        }
    }

    fn mark_failed(&self, temp_id: &str, error: &str) {
        self.messages
            .send_modify(|messages| {
                timeline::set_status(messages, temp_id, MessageStatus::Failed);
            });
        self.error.send_replace(Some(error.to_string()));
    }

    fn ensure_server_id(&self, message_id: &str) -> Result<()> {
        if is_temp_id(message_id) {
            return Err(ChatError::MessageNotFound.into());
        }
        Ok(())
    }

    fn apply_update(&self, result: Result<Message>, action: &str) -> Result<Message> {
        match result {
            Ok(message) => {
                self.messages
                    .send_if_modified(|messages| timeline::replace(messages, message.clone()));
                Ok(message)
            }
            Err(e) => {
                tracing::warn!("[CHAT] Message {} failed: {}", action, e);
                self.error.send_replace(Some(e.user_message()));
                Err(e)
            }
        }
    }

    fn handle_frame(&self, frame: &StompFrame) {
        if frame.command != StompCommand::Message || frame.destination() != Some(self.topic.as_str()) {
            return;
        }
        let event = match serde_json::from_str::<RoomEvent>(&frame.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("[CHAT] Ignoring undecodable frame on {}: {}", self.topic, e);
                return;
            }
        };

        match event {
            RoomEvent::Message(message) if message.room_id == self.room_id => {
                tracing::debug!("[CHAT] Received message {}", message.id);
                self.messages.send_modify(|messages| timeline::upsert(messages, *message));
            }
            RoomEvent::Message(message) => {
                tracing::debug!("[CHAT] Ignoring message {} of room {}", message.id, message.room_id);
            }
            RoomEvent::Status(update) => {
                self.messages
                    .send_if_modified(|messages| timeline::apply_status(messages, &update));
            }
            RoomEvent::Typing(event) if event.room_id == self.room_id && event.user_id != self.user_id => {
                self.typing.send_if_modified(|typing| {
                    if event.is_typing {
                        typing.insert(event.user_id)
                    } else {
                        typing.remove(&event.user_id)
                    }
                });
            }
            RoomEvent::Typing(_) => {}
        }
    }
}

async fn run_listener(session: Weak<SessionInner>, mut frames: broadcast::Receiver<StompFrame>) {
    loop {
        match frames.recv().await {
            Ok(frame) => {
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.handle_frame(&frame);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("[CHAT] Listener lagged, {} frames dropped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Reconnect whenever the connection sits in `Error`
///
/// This covers a session opened while offline as well as a dropped link.
/// One episode makes up to `max_attempts` tries; the next `Error` starts a
/// new episode.
async fn supervise(session: Weak<SessionInner>, mut state: watch::Receiver<ConnectionState>, policy: RetryPolicy) {
    loop {
        let current = state.borrow_and_update().clone();
        if let ConnectionState::Error(reason) = current {
            tracing::warn!("[CHAT] Connection in error: {}", reason);
            for attempt in 1..=policy.max_attempts {
                tokio::time::sleep(policy.delay_for(attempt)).await;
                if !matches!(*state.borrow(), ConnectionState::Error(_)) {
                    break;
                }
                let Some(session) = session.upgrade() else {
                    return;
                };
                match session.reconnect().await {
                    Ok(_) => break,
                    Err(e) => tracing::warn!(
                        "[CHAT] Reconnect attempt {}/{} failed: {}",
                        attempt,
                        policy.max_attempts,
                        e
                    ),
                }
            }
            // transitions made by our own attempts are not a new episode
            drop(state.borrow_and_update());
        }
        if state.changed().await.is_err() {
            break;
        }
    }
}

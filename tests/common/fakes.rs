//! In-process stand-ins for the REST API

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use shoot_client::client::api::dto::{
    DeleteMessageRequest, EditMessageRequest, MarkReadRequest, MessagePage, ReactionRequest, SendMessageRequest,
};
use shoot_client::client::api::MessageApi;
use shoot_client::shared::error::{ChatError, NetworkError, Result};
use shoot_client::shared::message::{Message, MessageContent, MessageStatus};

/// Scriptable [`MessageApi`]
#[derive(Default)]
pub struct FakeMessageApi {
    /// History pages by page index
    pub pages: Mutex<Vec<MessagePage>>,
    pub search_results: Mutex<Vec<Message>>,
    pub sent: Mutex<Vec<SendMessageRequest>>,
    pub read_requests: Mutex<Vec<MarkReadRequest>>,
    pub search_queries: Mutex<Vec<String>>,
    offline: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeMessageApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(messages: Vec<Message>) -> Self {
        let api = Self::default();
        api.pages.lock().unwrap().push(MessagePage {
            messages,
            has_more: false,
            next_cursor: None,
        });
        api
    }

    /// While offline every call fails with `NoConnection`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::NoConnection.into());
        }
        Ok(())
    }

    fn stored(&self, message_id: &str) -> Result<Message> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .flat_map(|page| page.messages.iter())
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| ChatError::MessageNotFound.into())
    }
}

#[async_trait]
impl MessageApi for FakeMessageApi {
    async fn get_messages(&self, _room_id: i64, page: u32, _size: u32, _cursor: Option<&str>) -> Result<MessagePage> {
        self.check_online()?;
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(page as usize)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        self.check_online()?;
        self.sent.lock().unwrap().push(request.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut message = Message::optimistic(
            request.temp_id.clone(),
            request.room_id,
            request.sender_id,
            request.content.text.clone(),
        );
        message.id = format!("srv_{n}");
        message.status = MessageStatus::Saved;
        Ok(message)
    }

    async fn edit_message(&self, request: &EditMessageRequest) -> Result<Message> {
        self.check_online()?;
        let mut message = self.stored(&request.message_id)?;
        message.content = MessageContent {
            is_edited: true,
            ..MessageContent::text(request.new_content.clone())
        };
        message.updated_at = Some(Utc::now());
        Ok(message)
    }

    async fn delete_message(&self, request: &DeleteMessageRequest) -> Result<Message> {
        self.check_online()?;
        let mut message = self.stored(&request.message_id)?;
        message.content.is_deleted = true;
        Ok(message)
    }

    async fn mark_as_read(&self, request: &MarkReadRequest) -> Result<()> {
        self.check_online()?;
        self.read_requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn toggle_reaction(&self, request: &ReactionRequest) -> Result<Message> {
        self.check_online()?;
        let mut message = self.stored(&request.message_id)?;
        let users = message.reactions.entry(request.reaction_type.clone()).or_insert_with(BTreeSet::new);
        if !users.remove(&request.user_id) {
            users.insert(request.user_id);
        }
        Ok(message)
    }

    async fn search_messages(&self, _room_id: i64, query: &str, _page: u32, _size: u32) -> Result<MessagePage> {
        self.check_online()?;
        self.search_queries.lock().unwrap().push(query.to_string());
        Ok(MessagePage {
            messages: self.search_results.lock().unwrap().clone(),
            has_more: false,
            next_cursor: None,
        })
    }
}

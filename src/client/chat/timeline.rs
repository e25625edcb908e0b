//! Operations on the visible message list.
//!
//! An entry is identified by its server id or its temp id; [`upsert`] keeps
//! the list free of two entries for one logical message.

use crate::shared::message::{is_temp_id, Message, MessageStatus, MessageStatusUpdate};

fn same_message(a: &Message, b: &Message) -> bool {
    a.matches(b) || b.matches(a)
}

fn has_key(message: &Message, key: &str) -> bool {
    message.id == key || message.temp_id.as_deref() == Some(key)
}

/// Replace the entry `message` belongs to, or append it
pub fn upsert(messages: &mut Vec<Message>, message: Message) {
    let Some(index) = messages.iter().position(|m| same_message(m, &message)) else {
        messages.push(message);
        return;
    };
    messages[index] = message;

    let mut i = index + 1;
    while i < messages.len() {
        if same_message(&messages[i], &messages[index]) {
            messages.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Replace an existing entry in place; unknown messages are ignored
pub fn replace(messages: &mut [Message], message: Message) -> bool {
    match messages.iter_mut().find(|m| same_message(m, &message)) {
        Some(slot) => {
            *slot = message;
            true
        }
        None => false,
    }
}

/// Set the status of the entry known by id or temp id `key`
pub fn set_status(messages: &mut [Message], key: &str, status: MessageStatus) -> bool {
    match messages.iter_mut().find(|m| has_key(m, key)) {
        Some(message) if message.status != status => {
            message.status = status;
            true
        }
        _ => false,
    }
}

/// Apply a server status update; a temporary entry adopts the server id
pub fn apply_status(messages: &mut [Message], update: &MessageStatusUpdate) -> bool {
    let found = messages.iter_mut().find(|m| {
        update.temp_id.as_deref().is_some_and(|temp| has_key(m, temp)) || has_key(m, &update.message_id)
    });
    let Some(message) = found else {
        return false;
    };

    if message.is_temporary() && !update.message_id.is_empty() && !is_temp_id(&update.message_id) {
        if message.temp_id.is_none() {
            message.temp_id = Some(message.id.clone());
        }
        message.id = update.message_id.clone();
    }
    message.status = update.status;
    if let Some(at) = update.timestamp {
        message.updated_at = Some(at);
    }
    true
}

pub fn status_of(messages: &[Message], key: &str) -> Option<MessageStatus> {
    messages.iter().find(|m| has_key(m, key)).map(|m| m.status)
}

pub fn find<'a>(messages: &'a [Message], key: &str) -> Option<&'a Message> {
    messages.iter().find(|m| has_key(m, key))
}

pub fn position_of(messages: &[Message], key: &str) -> Option<usize> {
    messages.iter().position(|m| has_key(m, key))
}

pub fn sort_by_created(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

/// Server ids of messages `user_id` has neither written nor read
pub fn unread_ids(messages: &[Message], user_id: i64) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.sender_id != user_id && !m.read_by.contains(&user_id) && !is_temp_id(&m.id))
        .map(|m| m.id.clone())
        .collect()
}

pub fn mark_read(messages: &mut [Message], ids: &[String], user_id: i64) {
    for message in messages.iter_mut().filter(|m| ids.contains(&m.id)) {
        message.read_by.insert(user_id);
    }
}

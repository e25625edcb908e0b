//! Property-based tests for message identity and the visible list

use proptest::prelude::*;
use shoot_client::client::chat::timeline;
use shoot_client::client::offline::{BackoffStrategy, RetryPolicy};
use shoot_client::shared::message::{Message, MessageStatus, PendingMessage};

proptest! {
    #[test]
    fn test_queued_message_keeps_identity(
        suffix in "[a-z0-9]{1,12}",
        room_id in 1i64..10_000,
        sender_id in 1i64..10_000,
        text in "\\PC{0,80}",
    ) {
        let temp_id = format!("temp_{suffix}");
        let pending = PendingMessage::new(temp_id.clone(), room_id, sender_id, text.clone());

        let shown = pending.to_message();
        prop_assert_eq!(&shown.id, &temp_id);
        prop_assert_eq!(shown.temp_id.as_deref(), Some(temp_id.as_str()));
        prop_assert!(shown.is_temporary());

        let restaged = PendingMessage::from_message(&shown);
        prop_assert_eq!(restaged.id, temp_id);
        prop_assert_eq!(restaged.room_id, room_id);
        prop_assert_eq!(restaged.sender_id, sender_id);
        prop_assert_eq!(restaged.content, text);
    }

    /// However confirmations interleave with local entries, one temp id
    /// never shows up twice
    #[test]
    fn test_upsert_keeps_one_entry_per_temp_id(
        events in prop::collection::vec((0usize..4, any::<bool>()), 1..30),
    ) {
        let mut messages: Vec<Message> = Vec::new();
        for (n, confirmed) in events {
            let temp_id = format!("temp_{n}");
            let mut message = Message::optimistic(temp_id, 42, 7, "hi");
            if confirmed {
                message.id = format!("m{n}");
                message.status = MessageStatus::Saved;
            }
            timeline::upsert(&mut messages, message);
        }

        let mut temp_ids: Vec<_> = messages.iter().filter_map(|m| m.temp_id.clone()).collect();
        let total = temp_ids.len();
        temp_ids.sort();
        temp_ids.dedup();
        prop_assert_eq!(temp_ids.len(), total);
        prop_assert!(messages.len() <= 4);
    }

    #[test]
    fn test_exponential_backoff_is_monotonic_and_capped(
        base_ms in 1u64..1_000,
        max_ms in 1u64..60_000,
        attempt in 1u32..64,
    ) {
        let policy = RetryPolicy::new(5, BackoffStrategy::Exponential { base_ms, max_ms });
        let current = policy.delay_for(attempt);
        let next = policy.delay_for(attempt + 1);
        prop_assert!(next >= current);
        prop_assert!(next.as_millis() <= u128::from(max_ms));
    }
}

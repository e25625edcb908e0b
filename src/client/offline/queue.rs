//! # Offline Message Queue
//!
//! Holds messages that could not be delivered and replays them when the
//! client is back online.
//!
//! ## Features
//!
//! - **Durable**: every mutation is written through to the [`DurableStore`];
//!   entries left in `Sending` by a crash come back as `Pending`
//! - **Ordered**: entries keep insertion order, per room as well
//! - **Bounded retries**: an entry failing `max_attempts` times stays visible
//!   as `Failed` but is skipped until [`OfflineMessageQueue::requeue`]
//! - **Single pass**: overlapping [`OfflineMessageQueue::process_all`] calls
//!   return [`ProcessOutcome::AlreadyRunning`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shoot_client::client::offline::queue::OfflineMessageQueue;
//! use shoot_client::client::offline::retry::RetryPolicy;
//! use shoot_client::client::store::MemoryStore;
//! use shoot_client::shared::message::PendingMessage;
//!
//! # async fn example() -> shoot_client::shared::error::Result<()> {
//! let queue = OfflineMessageQueue::open(Arc::new(MemoryStore::new()), RetryPolicy::default()).await?;
//! queue.enqueue(PendingMessage::new("temp_1", 42, 7, "Hello offline!")).await?;
//!
//! queue
//!     .process_all(|pending| async move {
//!         // deliver `pending`...
//!         # Ok(pending.to_message())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};

use super::retry::RetryPolicy;
use crate::client::store::{self, DurableStore};
use crate::shared::error::{Result, ShootError};
use crate::shared::message::{Message, PendingMessage, QueueStatus};

/// Store namespace of queued messages
pub const QUEUE_NAMESPACE: &str = "pending_messages";

/// Result of a [`OfflineMessageQueue::process_all`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Another pass was in flight; nothing was sent
    AlreadyRunning,
    Completed(ProcessSummary),
}

/// Counters of one processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Entries not eligible in this pass
    pub skipped: usize,
}

/// Durable queue of undelivered messages
pub struct OfflineMessageQueue {
    store: Arc<dyn DurableStore>,
    policy: RetryPolicy,
    entries: watch::Sender<Vec<PendingMessage>>,
    write_lock: Mutex<()>,
    processing: Mutex<()>,
}

impl OfflineMessageQueue {
    /// Restore the queue from `store`
    pub async fn open(store: Arc<dyn DurableStore>, policy: RetryPolicy) -> Result<Self> {
        let mut entries: Vec<PendingMessage> = store::load_json(store.as_ref(), QUEUE_NAMESPACE).await?;

        let mut interrupted = 0;
        for entry in entries.iter_mut().filter(|e| e.status == QueueStatus::Sending) {
            entry.status = QueueStatus::Pending;
            store::put_json(store.as_ref(), QUEUE_NAMESPACE, &entry.id, entry).await?;
            interrupted += 1;
        }
        if !entries.is_empty() {
            tracing::info!(
                "[QUEUE] Restored {} pending messages ({} interrupted mid-send)",
                entries.len(),
                interrupted
            );
        }

        let (entries, _) = watch::channel(entries);
        Ok(Self {
            store,
            policy,
            entries,
            write_lock: Mutex::new(()),
            processing: Mutex::new(()),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Append `message`; returns `false` when its id is already queued
    pub async fn enqueue(&self, message: PendingMessage) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.entries.borrow().iter().any(|e| e.id == message.id) {
            tracing::debug!("[QUEUE] {} already queued", message.id);
            return Ok(false);
        }

        store::put_json(self.store.as_ref(), QUEUE_NAMESPACE, &message.id, &message).await?;
        tracing::info!("[QUEUE] Queued {} for room {}", message.id, message.room_id);
        self.entries.send_modify(|entries| entries.push(message));
        Ok(true)
    }

    /// Remove the entry; returns whether it existed
    pub async fn dequeue(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if !self.entries.borrow().iter().any(|e| e.id == id) {
            return Ok(false);
        }

        self.store.delete(QUEUE_NAMESPACE, id).await?;
        self.entries.send_modify(|entries| entries.retain(|e| e.id != id));
        Ok(true)
    }

    /// Give up on a message for good
    pub async fn dismiss(&self, id: &str) -> Result<bool> {
        let removed = self.dequeue(id).await?;
        if removed {
            tracing::info!("[QUEUE] Dismissed {}", id);
        }
        Ok(removed)
    }

    pub async fn update_status(&self, id: &str, status: QueueStatus) -> Result<()> {
        self.modify(id, |entry| {
            entry.status = status;
            true
        })
        .await?;
        Ok(())
    }

    /// Put an entry back into automatic processing with a fresh retry budget
    pub async fn requeue(&self, id: &str) -> Result<bool> {
        let updated = self
            .modify(id, |entry| {
                if entry.status == QueueStatus::Sending {
                    return false;
                }
                entry.status = QueueStatus::Pending;
                entry.retry_count = 0;
                entry.last_attempt_at = None;
                entry.last_error = None;
                true
            })
            .await?;
        Ok(updated.is_some())
    }

    /// Claim an entry for a user-initiated resend, ignoring the retry ceiling
    ///
    /// Returns `None` when the entry is absent or a pass is already sending it.
    pub async fn claim_for_retry(&self, id: &str) -> Result<Option<PendingMessage>> {
        let now = Utc::now();
        self.modify(id, |entry| {
            if entry.status == QueueStatus::Sending {
                return false;
            }
            entry.status = QueueStatus::Sending;
            entry.last_attempt_at = Some(now);
            true
        })
        .await
    }

    /// Record a failed delivery
    ///
    /// A non-retryable error spends the whole retry budget so the entry is
    /// skipped by later passes and only a manual retry sends it again.
    /// Returns the attempts counted so far.
    pub async fn record_failure(&self, id: &str, error: &ShootError) -> Result<u32> {
        let now = Utc::now();
        let ceiling = self.policy.max_attempts;
        let permanent = !error.is_retryable();
        let updated = self
            .modify(id, |entry| {
                entry.status = QueueStatus::Failed;
                entry.retry_count += 1;
                if permanent {
                    entry.retry_count = entry.retry_count.max(ceiling);
                }
                entry.last_attempt_at = Some(now);
                entry.last_error = Some(error.to_string());
                true
            })
            .await?;
        Ok(updated.map(|entry| entry.retry_count).unwrap_or_default())
    }

    /// All entries in insertion order
    pub fn pending_messages(&self) -> Vec<PendingMessage> {
        self.entries.borrow().clone()
    }

    /// Entries of one room in insertion order
    pub fn pending_for_room(&self, room_id: i64) -> Vec<PendingMessage> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.room_id == room_id)
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn get(&self, id: &str) -> Option<PendingMessage> {
        self.entries.borrow().iter().find(|e| e.id == id).cloned()
    }

    /// Observe the full list
    pub fn subscribe(&self) -> watch::Receiver<Vec<PendingMessage>> {
        self.entries.subscribe()
    }

    /// Whether `entry` would be sent by a pass at `now`
    pub fn is_eligible(&self, entry: &PendingMessage, now: DateTime<Utc>) -> bool {
        matches!(entry.status, QueueStatus::Pending | QueueStatus::Failed)
            && !self.policy.is_exhausted(entry.retry_count)
            && self.policy.is_due(entry.retry_count, entry.last_attempt_at, now)
    }

    /// Try to deliver every eligible entry through `send_fn`
    ///
    /// Delivered entries are removed. A failure counts a retry and marks the
    /// entry `Failed`. A cancelled delivery puts the entry back to `Pending`
    /// uncounted and ends the pass with the cancellation.
    pub async fn process_all<F, Fut>(&self, send_fn: F) -> Result<ProcessOutcome>
    where
        F: Fn(PendingMessage) -> Fut,
        Fut: Future<Output = Result<Message>>,
    {
        let Ok(_pass) = self.processing.try_lock() else {
            tracing::debug!("[QUEUE] Processing already in flight");
            return Ok(ProcessOutcome::AlreadyRunning);
        };

        let snapshot = self.pending_messages();
        let mut summary = ProcessSummary::default();

        for candidate in snapshot {
            let Some(entry) = self.claim(&candidate.id).await? else {
                summary.skipped += 1;
                continue;
            };
            summary.attempted += 1;

            let mut claim = ClaimGuard::new(&self.entries, &entry.id);
            let result = send_fn(entry.clone()).await;
            claim.disarm();

            match result {
                Ok(_) => {
                    self.dequeue(&entry.id).await?;
                    summary.delivered += 1;
                    tracing::info!("[QUEUE] Delivered {}", entry.id);
                }
                Err(e) if e.is_cancellation() => {
                    self.update_status(&entry.id, QueueStatus::Pending).await?;
                    tracing::info!("[QUEUE] Delivery of {} cancelled", entry.id);
                    return Err(e);
                }
                Err(e) => {
                    let attempts = self.record_failure(&entry.id, &e).await?;
                    summary.failed += 1;
                    if self.policy.is_exhausted(attempts) {
                        tracing::warn!(
                            "[QUEUE] Giving up on {} after {} attempts: {}",
                            entry.id,
                            attempts,
                            e
                        );
                    } else {
                        tracing::warn!("[QUEUE] Delivery of {} failed (attempt {}): {}", entry.id, attempts, e);
                    }
                }
            }
        }

        Ok(ProcessOutcome::Completed(summary))
    }

    /// Drop every entry
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.clear(QUEUE_NAMESPACE).await?;
        self.entries.send_replace(Vec::new());
        Ok(())
    }

    /// Mark the entry `Sending` if it is still eligible
    async fn claim(&self, id: &str) -> Result<Option<PendingMessage>> {
        let now = Utc::now();
        self.modify(id, |entry| {
            if !self.is_eligible(entry, now) {
                return false;
            }
            entry.status = QueueStatus::Sending;
            entry.last_attempt_at = Some(now);
            true
        })
        .await
    }

    /// Apply `change` to the entry and persist it when the closure returns `true`
    async fn modify<F>(&self, id: &str, change: F) -> Result<Option<PendingMessage>>
    where
        F: FnOnce(&mut PendingMessage) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let Some(mut entry) = self.get(id) else {
            return Ok(None);
        };
        if !change(&mut entry) {
            return Ok(None);
        }

        store::put_json(self.store.as_ref(), QUEUE_NAMESPACE, id, &entry).await?;
        self.entries.send_modify(|entries| {
            if let Some(slot) = entries.iter_mut().find(|e| e.id == id) {
                *slot = entry.clone();
            }
        });
        Ok(Some(entry))
    }
}

/// Returns a claimed entry to `Pending` when the pass is dropped mid-send
struct ClaimGuard<'a> {
    entries: &'a watch::Sender<Vec<PendingMessage>>,
    id: &'a str,
    armed: bool,
}

impl<'a> ClaimGuard<'a> {
    fn new(entries: &'a watch::Sender<Vec<PendingMessage>>, id: &'a str) -> Self {
        Self { entries, id, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // the persisted copy stays `Sending` and is reset on the next open
        self.entries.send_modify(|entries| {
            if let Some(entry) = entries.iter_mut().find(|e| e.id == self.id) {
                entry.status = QueueStatus::Pending;
            }
        });
    }
}

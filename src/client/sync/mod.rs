//! # Sync Manager
//!
//! Pushes locally queued mutations to the server and pulls fresh data back,
//! one category at a time.
//!
//! ## Architecture
//!
//! - **Push**: [`PendingSyncOperation`]s are persisted in the durable store and
//!   dispatched by kind to the [`SyncBackend`] under the injected
//!   [`RetryPolicy`]: a failed operation waits out its backoff delay, and one
//!   that reaches its ceiling or fails permanently moves to a dead-letter list.
//! - **Pull**: categories are pulled in the fixed order of
//!   [`SyncEntityType::ALL`]. A failing category never stops the others, and a
//!   category with unpushed local changes is deferred to the next pass.
//! - **State**: a single `watch` cell holds the [`SyncState`]; `sync_all`
//!   claims it with an atomic check-and-set so passes never overlap.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use std::time::Duration;
//! # use shoot_client::client::offline::retry::RetryPolicy;
//! # use shoot_client::client::sync::{SyncBackend, SyncManager};
//! # use shoot_client::client::store::MemoryStore;
//! # async fn run(backend: Arc<dyn SyncBackend>) -> shoot_client::shared::error::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let manager = Arc::new(SyncManager::open(backend, store, RetryPolicy::default()).await?);
//! let _periodic = manager.spawn_periodic(Duration::from_secs(300));
//! manager.sync_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod sync_state;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::offline::retry::RetryPolicy;
use crate::client::store::{self, DurableStore};
use crate::shared::error::{Result, ShootError};

pub use sync_state::{
    DeadLetter, PendingSyncOperation, PushSummary, SyncEntityType, SyncOperationType, SyncOutcome, SyncReport,
    SyncState,
};

pub const OPERATIONS_NAMESPACE: &str = "sync_operations";
pub const DEAD_LETTER_NAMESPACE: &str = "sync_dead_letter";
pub const LAST_SYNC_NAMESPACE: &str = "sync_meta";

/// Server side of synchronization
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn create(&self, entity_type: SyncEntityType, entity_id: &str, payload: &str) -> Result<()>;

    async fn update(&self, entity_type: SyncEntityType, entity_id: &str, payload: &str) -> Result<()>;

    async fn delete(&self, entity_type: SyncEntityType, entity_id: &str) -> Result<()>;

    /// Fetch everything of `entity_type` changed since `since` and store it locally
    async fn pull(&self, entity_type: SyncEntityType, since: Option<DateTime<Utc>>) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastSync {
    entity_type: SyncEntityType,
    at: DateTime<Utc>,
}

pub struct SyncManager {
    backend: Arc<dyn SyncBackend>,
    store: Arc<dyn DurableStore>,
    policy: RetryPolicy,
    state: watch::Sender<SyncState>,
    operations: watch::Sender<Vec<PendingSyncOperation>>,
    ops_lock: Mutex<()>,
    last_sync: RwLock<HashMap<SyncEntityType, DateTime<Utc>>>,
    dead_letters: RwLock<Vec<DeadLetter>>,
    online: watch::Sender<bool>,
}

impl SyncManager {
    /// Restore pending operations, dead letters and last-sync times from `store`
    pub async fn open(
        backend: Arc<dyn SyncBackend>,
        store: Arc<dyn DurableStore>,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let operations: Vec<PendingSyncOperation> = store::load_json(store.as_ref(), OPERATIONS_NAMESPACE).await?;
        let dead_letters: Vec<DeadLetter> = store::load_json(store.as_ref(), DEAD_LETTER_NAMESPACE).await?;
        let last_sync: Vec<LastSync> = store::load_json(store.as_ref(), LAST_SYNC_NAMESPACE).await?;

        if !operations.is_empty() {
            tracing::info!("[SYNC] Restored {} pending operations", operations.len());
        }

        let (state, _) = watch::channel(SyncState::Idle);
        let (operations, _) = watch::channel(operations);
        let (online, _) = watch::channel(true);

        Ok(Self {
            backend,
            store,
            policy,
            state,
            operations,
            ops_lock: Mutex::new(()),
            last_sync: RwLock::new(last_sync.into_iter().map(|entry| (entry.entity_type, entry.at)).collect()),
            dead_letters: RwLock::new(dead_letters),
            online,
        })
    }

    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn set_online(&self, online: bool) {
        self.online.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            tracing::info!("[SYNC] Network {}", if online { "online" } else { "offline" });
            *current = online;
            true
        });
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn watch_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Push all pending operations, then pull every category
    pub async fn sync_all(&self) -> Result<SyncOutcome> {
        let claimed = self.state.send_if_modified(|state| {
            if state.is_syncing() {
                return false;
            }
            *state = SyncState::Syncing;
            true
        });
        if !claimed {
            tracing::debug!("[SYNC] Sync already in progress");
            return Ok(SyncOutcome::AlreadyRunning);
        }

        let mut guard = SyncingGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.run_pass().await;
        guard.armed = false;

        match result {
            Ok(report) => {
                let now = Utc::now();
                match report.error_message() {
                    None => {
                        tracing::info!(
                            "[SYNC] Sync complete: {} pushed, {} pulled, {} deferred",
                            report.push.pushed,
                            report.synced.len(),
                            report.deferred.len()
                        );
                        self.state.send_replace(SyncState::Success { at: now });
                    }
                    Some(message) => {
                        tracing::warn!("[SYNC] Sync finished with errors: {}", message);
                        self.state.send_replace(SyncState::Error { message, at: now });
                    }
                }
                Ok(SyncOutcome::Completed(report))
            }
            Err(e) => {
                tracing::debug!("[SYNC] Sync interrupted: {}", e);
                self.state.send_replace(SyncState::Idle);
                Err(e)
            }
        }
    }

    async fn run_pass(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        match self.process_pending_operations().await {
            Ok(summary) => report.push = summary,
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                tracing::warn!("[SYNC] Push phase failed: {}", e);
                report.push_error = Some(e.to_string());
            }
        }

        let unpushed: HashSet<SyncEntityType> = self.operations.borrow().iter().map(|op| op.entity_type).collect();

        for entity_type in SyncEntityType::ALL {
            if unpushed.contains(&entity_type) {
                tracing::debug!("[SYNC] Deferring {} pull, local changes pending", entity_type);
                report.deferred.push(entity_type);
                continue;
            }
            match self.sync(entity_type).await {
                Ok(()) => report.synced.push(entity_type),
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    tracing::warn!("[SYNC] Pull of {} failed: {}", entity_type, e);
                    report.failed.push((entity_type, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Pull one category and advance its last-sync time
    pub async fn sync(&self, entity_type: SyncEntityType) -> Result<()> {
        let since = self.last_sync_time(entity_type).await;
        self.backend.pull(entity_type, since).await?;

        let now = Utc::now();
        let entry = LastSync { entity_type, at: now };
        store::put_json(self.store.as_ref(), LAST_SYNC_NAMESPACE, entity_type.as_str(), &entry).await?;
        self.last_sync.write().await.insert(entity_type, now);
        tracing::debug!("[SYNC] Pulled {}", entity_type);
        Ok(())
    }

    pub async fn last_sync_time(&self, entity_type: SyncEntityType) -> Option<DateTime<Utc>> {
        self.last_sync.read().await.get(&entity_type).copied()
    }

    /// Queue a local mutation; an operation with the same id is replaced
    ///
    /// Waits for a running push pass so its result cannot overwrite the new
    /// version.
    pub async fn add_pending_operation(&self, operation: PendingSyncOperation) -> Result<()> {
        let _lock = self.ops_lock.lock().await;
        store::put_json(self.store.as_ref(), OPERATIONS_NAMESPACE, &operation.id, &operation).await?;
        tracing::debug!(
            "[SYNC] Queued {:?} {} {}",
            operation.operation,
            operation.entity_type,
            operation.entity_id
        );
        self.operations.send_modify(|ops| match ops.iter_mut().find(|op| op.id == operation.id) {
            Some(existing) => *existing = operation,
            None => ops.push(operation),
        });
        Ok(())
    }

    pub fn pending_operations(&self) -> Vec<PendingSyncOperation> {
        self.operations.borrow().clone()
    }

    pub fn pending_operation_count(&self) -> usize {
        self.operations.borrow().len()
    }

    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.read().await.clone()
    }

    pub async fn clear_dead_letters(&self) -> Result<()> {
        self.store.clear(DEAD_LETTER_NAMESPACE).await?;
        self.dead_letters.write().await.clear();
        Ok(())
    }

    /// Dispatch every pending operation whose backoff delay has elapsed
    pub async fn process_pending_operations(&self) -> Result<PushSummary> {
        let _lock = self.ops_lock.lock().await;
        let snapshot = self.pending_operations();
        let mut summary = PushSummary::default();

        for op in snapshot {
            if !self.policy.is_due(op.retry_count, op.last_attempt_at, Utc::now()) {
                summary.skipped += 1;
                continue;
            }
            match self.dispatch(&op).await {
                Ok(()) => {
                    self.remove_operation(&op.id).await?;
                    summary.pushed += 1;
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    let mut failed = op;
                    failed.retry_count += 1;
                    failed.last_attempt_at = Some(Utc::now());
                    let ceiling = failed.ceiling(&self.policy);
                    if !e.is_retryable() || failed.retry_count >= ceiling {
                        self.dead_letter(failed, &e).await?;
                        summary.dead_lettered += 1;
                    } else {
                        tracing::warn!(
                            "[SYNC] {:?} {} {} failed (attempt {}/{}): {}",
                            failed.operation,
                            failed.entity_type,
                            failed.entity_id,
                            failed.retry_count,
                            ceiling,
                            e
                        );
                        store::put_json(self.store.as_ref(), OPERATIONS_NAMESPACE, &failed.id, &failed).await?;
                        self.operations.send_modify(|ops| {
                            if let Some(existing) = ops.iter_mut().find(|op| op.id == failed.id) {
                                *existing = failed;
                            }
                        });
                        summary.retried += 1;
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn dead_letter(&self, operation: PendingSyncOperation, error: &ShootError) -> Result<()> {
        tracing::error!(
            "[SYNC] Dropping {:?} {} {} after {} attempts: {}",
            operation.operation,
            operation.entity_type,
            operation.entity_id,
            operation.retry_count,
            error
        );
        let id = operation.id.clone();
        let letter = DeadLetter {
            operation,
            error: error.to_string(),
            failed_at: Utc::now(),
        };
        store::put_json(self.store.as_ref(), DEAD_LETTER_NAMESPACE, &id, &letter).await?;
        self.remove_operation(&id).await?;
        self.dead_letters.write().await.push(letter);
        Ok(())
    }

    async fn dispatch(&self, op: &PendingSyncOperation) -> Result<()> {
        match op.operation {
            SyncOperationType::Create => self.backend.create(op.entity_type, &op.entity_id, &op.payload).await,
            SyncOperationType::Update => self.backend.update(op.entity_type, &op.entity_id, &op.payload).await,
            SyncOperationType::Delete => self.backend.delete(op.entity_type, &op.entity_id).await,
        }
    }

    async fn remove_operation(&self, id: &str) -> Result<()> {
        self.store.delete(OPERATIONS_NAMESPACE, id).await?;
        self.operations.send_if_modified(|ops| {
            let before = ops.len();
            ops.retain(|op| op.id != id);
            ops.len() != before
        });
        Ok(())
    }

    /// Run `sync_all` every `interval` while online
    ///
    /// The loop holds a weak reference and ends once the manager is dropped.
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> PeriodicSync {
        let interval = interval.max(Duration::from_millis(1));
        let manager = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if !manager.is_online() {
                    tracing::debug!("[SYNC] Offline, skipping periodic sync");
                    continue;
                }
                if let Err(e) = manager.sync_all().await {
                    tracing::warn!("[SYNC] Periodic sync failed: {}", e);
                }
            }
        });
        PeriodicSync { handle }
    }
}

/// Resets a claimed `Syncing` state when a pass is dropped mid-flight
struct SyncingGuard<'a> {
    state: &'a watch::Sender<SyncState>,
    armed: bool,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(SyncState::Idle);
        }
    }
}

/// Handle of the periodic sync loop; dropping it stops the loop
pub struct PeriodicSync {
    handle: JoinHandle<()>,
}

impl PeriodicSync {
    pub fn stop(self) {}

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

//! # Durable Store
//!
//! Namespaced key-value persistence behind the offline queue, the sync
//! manager and the token manager. Values are JSON text; each namespace keeps
//! the insertion order of its keys, and overwriting a key keeps its original
//! position.
//!
//! ## Key Components
//!
//! - [`DurableStore`]: the storage seam
//! - [`MemoryStore`]: ephemeral sessions and tests
//! - [`sqlite::SqliteStore`]: SQLite file under the platform data dir

pub mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::shared::error::Result;

pub use sqlite::SqliteStore;

/// Namespaced key-value store
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Insert or overwrite `key`, keeping its original position on overwrite
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()>;

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Remove `key`; absent keys are not an error
    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;

    /// All entries of `namespace` in insertion order
    async fn load(&self, namespace: &str) -> Result<Vec<(String, String)>>;

    async fn clear(&self, namespace: &str) -> Result<()>;
}

/// Serialize `value` and store it under `key`
pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn DurableStore,
    namespace: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.put(namespace, key, &json).await
}

/// Load a single JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn DurableStore,
    namespace: &str,
    key: &str,
) -> Result<Option<T>> {
    match store.get(namespace, key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Load every value of a namespace, skipping entries that no longer decode
pub async fn load_json<T: DeserializeOwned>(store: &dyn DurableStore, namespace: &str) -> Result<Vec<T>> {
    let rows = store.load(namespace).await?;
    let mut values = Vec::with_capacity(rows.len());
    for (key, json) in rows {
        match serde_json::from_str(&json) {
            Ok(value) => values.push(value),
            Err(e) => tracing::warn!("[STORE] Skipping undecodable {}/{}: {}", namespace, key, e),
        }
    }
    Ok(values)
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, Vec<(String, String)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn put(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .and_then(|entries| entries.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.clone()))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let mut namespaces = self.namespaces.write().await;
        if let Some(entries) = namespaces.get_mut(namespace) {
            entries.retain(|(k, _)| k != key);
        }
        Ok(())
    }

    async fn load(&self, namespace: &str) -> Result<Vec<(String, String)>> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces.get(namespace).cloned().unwrap_or_default())
    }

    async fn clear(&self, namespace: &str) -> Result<()> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }
}

//! Token storage
//!
//! Access and refresh tokens live in the durable store (namespace `auth`) and
//! are cached in memory. `watch_logged_in` follows the access token.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::client::store::{self, DurableStore};
use crate::shared::error::Result;

pub const AUTH_NAMESPACE: &str = "auth";
const ACCESS_KEY: &str = "access_token";
const REFRESH_KEY: &str = "refresh_token";

#[derive(Debug, Default, Clone)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Persisted access/refresh token pair
pub struct TokenManager {
    store: Arc<dyn DurableStore>,
    tokens: RwLock<Tokens>,
    logged_in: watch::Sender<bool>,
}

impl TokenManager {
    /// Restore tokens from `store`
    pub async fn open(store: Arc<dyn DurableStore>) -> Result<Self> {
        let access: Option<String> = store::get_json(store.as_ref(), AUTH_NAMESPACE, ACCESS_KEY).await?;
        let refresh: Option<String> = store::get_json(store.as_ref(), AUTH_NAMESPACE, REFRESH_KEY).await?;
        let (logged_in, _) = watch::channel(access.is_some());
        if access.is_some() {
            tracing::debug!("[AUTH] Restored session token");
        }
        Ok(Self {
            store,
            tokens: RwLock::new(Tokens { access, refresh }),
            logged_in,
        })
    }

    pub async fn save_access_token(&self, token: &str) -> Result<()> {
        store::put_json(self.store.as_ref(), AUTH_NAMESPACE, ACCESS_KEY, token).await?;
        self.tokens.write().await.access = Some(token.to_string());
        self.logged_in.send_replace(true);
        Ok(())
    }

    pub async fn save_refresh_token(&self, token: &str) -> Result<()> {
        store::put_json(self.store.as_ref(), AUTH_NAMESPACE, REFRESH_KEY, token).await?;
        self.tokens.write().await.refresh = Some(token.to_string());
        Ok(())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.refresh.clone()
    }

    /// Forget both tokens (logout)
    pub async fn clear(&self) -> Result<()> {
        self.store.clear(AUTH_NAMESPACE).await?;
        *self.tokens.write().await = Tokens::default();
        self.logged_in.send_replace(false);
        tracing::info!("[AUTH] Tokens cleared");
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        *self.logged_in.borrow()
    }

    pub fn watch_logged_in(&self) -> watch::Receiver<bool> {
        self.logged_in.subscribe()
    }
}

//! Bearer-token session registry.
//!
//! Tokens are durable (they survive restarts) with an in-memory read-through
//! cache in front. The cache is rebuilt lazily from the store rather than
//! eagerly at boot: a cache miss falls back to the database and refills the
//! entry. Entries are insert-only, so concurrent handlers need no
//! read-modify-write coordination.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::Store;
use crate::entities::users;
use crate::services::error::AuthError;
use crate::services::password::generate_token;

/// Explicitly constructed token -> username cache. Owned by the session
/// service instance, so tests can build isolated registries.
#[derive(Clone, Default)]
pub struct TokenCache {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl TokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, token: &str) -> Option<String> {
        self.inner.read().await.get(token).cloned()
    }

    pub async fn insert(&self, token: String, username: String) {
        self.inner.write().await.insert(token, username);
    }

    pub async fn forget_user(&self, username: &str) {
        self.inner.write().await.retain(|_, v| v != username);
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Store,
    cache: TokenCache,
}

impl SessionService {
    #[must_use]
    pub const fn new(store: Store, cache: TokenCache) -> Self {
        Self { store, cache }
    }

    /// Issues a fresh bearer token for `username`, recording it durably and
    /// in the cache. Tokens have no expiry and are never reassigned.
    pub async fn issue(&self, username: &str) -> Result<String, AuthError> {
        let token = generate_token();
        self.store.insert_token(&token, username).await?;
        self.cache
            .insert(token.clone(), username.to_string())
            .await;
        Ok(token)
    }

    /// Cache-first token resolution. A miss in both layers is a non-error
    /// "no such session" result.
    pub async fn resolve(&self, token: &str) -> Result<Option<String>, AuthError> {
        if let Some(username) = self.cache.get(token).await {
            return Ok(Some(username));
        }

        let username = self.store.find_token_username(token).await?;
        if let Some(username) = &username {
            self.cache
                .insert(token.to_string(), username.clone())
                .await;
        }

        Ok(username)
    }

    /// Resolves an `Authorization` header to a live user record.
    pub async fn authenticate_header(
        &self,
        header: Option<&str>,
    ) -> Result<users::Model, AuthError> {
        let token = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("Missing token".to_string()))?;

        self.authenticate_token(token).await
    }

    /// Resolves a bare token to a live user record. Fails if the token does
    /// not resolve or the resolved user has since been deleted.
    pub async fn authenticate_token(&self, token: &str) -> Result<users::Model, AuthError> {
        let username = self
            .resolve(token)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("Invalid token".to_string()))?;

        self.store
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("Invalid token".to_string()))
    }

    /// Drops all sessions for a (deleted) user, durable rows and cache both.
    pub async fn forget_user(&self, username: &str) -> Result<(), AuthError> {
        self.store.delete_tokens_for_user(username).await?;
        self.cache.forget_user(username).await;
        Ok(())
    }
}

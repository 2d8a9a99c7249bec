//! In-process platform for tests and local development

use async_trait::async_trait;
use chrono::Utc;
use secret_core::protocol::SecretRecord;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{IdentityProvider, SecretRepository, UserId};
use crate::error::PlatformError;

/// Identity provider and repository backed by in-memory maps
#[derive(Default)]
pub struct MemoryPlatform {
    tokens: RwLock<HashMap<String, UserId>>,
    records: RwLock<HashMap<UserId, SecretRecord>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user and return a bearer token for it
    pub async fn issue_token(&self) -> (String, UserId) {
        let user = Uuid::new_v4();
        let token = self.issue_token_for(user).await;
        (token, user)
    }

    /// Issue an additional token for an existing user
    pub async fn issue_token_for(&self, user: UserId) -> String {
        let token = format!("mem.{}.{}", user.simple(), Uuid::new_v4().simple());
        self.tokens.write().await.insert(token.clone(), user);
        token
    }

    /// Invalidate a single token
    pub async fn revoke(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryPlatform {
    async fn authenticate(&self, bearer: &str) -> Result<UserId, PlatformError> {
        self.tokens
            .read()
            .await
            .get(bearer)
            .copied()
            .ok_or_else(|| PlatformError::Unauthorized("Invalid or expired token".to_string()))
    }

    async fn delete_user(&self, user: UserId) -> Result<(), PlatformError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, owner| *owner != user);
        if tokens.len() == before {
            return Err(PlatformError::Upstream(format!("User {} not found", user)));
        }

        self.records.write().await.remove(&user);
        debug!("Deleted user {} and its record", user);
        Ok(())
    }
}

#[async_trait]
impl SecretRepository for MemoryPlatform {
    async fn fetch(&self, user: UserId) -> Result<Option<SecretRecord>, PlatformError> {
        Ok(self.records.read().await.get(&user).cloned())
    }

    async fn upsert(&self, user: UserId, blob: &str) -> Result<SecretRecord, PlatformError> {
        let now = Utc::now();
        let mut records = self.records.write().await;

        let record = records
            .entry(user)
            .and_modify(|record| {
                record.encrypted_secret = blob.to_string();
                record.updated_at = now;
            })
            .or_insert_with(|| SecretRecord {
                user_id: user,
                encrypted_secret: blob.to_string(),
                created_at: now,
                updated_at: now,
            });

        Ok(record.clone())
    }
}

//! Seams to the hosted identity service and database
//!
//! Handlers only see these traits, so the same router runs against the
//! in-process platform in tests and the hosted one in production.

mod memory;
mod supabase;

pub use memory::MemoryPlatform;
pub use supabase::SupabasePlatform;

use async_trait::async_trait;
use secret_core::protocol::SecretRecord;
use uuid::Uuid;

use crate::error::PlatformError;

/// Identifier of an authenticated user
pub type UserId = Uuid;

/// Resolves bearer tokens to users and manages accounts
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token, failing with [`PlatformError::Unauthorized`]
    async fn authenticate(&self, bearer: &str) -> Result<UserId, PlatformError>;

    /// Delete the user; their secret record goes with them
    async fn delete_user(&self, user: UserId) -> Result<(), PlatformError>;
}

/// Per-user storage of the encrypted secret
#[async_trait]
pub trait SecretRepository: Send + Sync {
    async fn fetch(&self, user: UserId) -> Result<Option<SecretRecord>, PlatformError>;

    /// Insert or replace the user's record, keeping its creation time
    async fn upsert(&self, user: UserId, blob: &str) -> Result<SecretRecord, PlatformError>;
}

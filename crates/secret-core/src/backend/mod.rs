//! Client side of the secret store protocol
//!
//! The backend is an injected dependency so tests can substitute a fake.

mod http;

pub use http::HttpSecretBackend;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::SessionCredential;

/// Remote store for the encrypted secret blob
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Fetch the caller's blob; `None` when nothing has been saved
    async fn fetch_secret(&self, credential: &SessionCredential) -> Result<Option<String>>;

    /// Insert or replace the caller's blob
    async fn save_secret(&self, credential: &SessionCredential, blob: &str) -> Result<()>;

    /// Delete the caller's account together with its saved blob
    async fn delete_account(&self, credential: &SessionCredential) -> Result<()>;
}

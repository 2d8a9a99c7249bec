//! Local store trait definitions

use crate::error::Result;

/// Well-known key the secret is stored under
pub const LOCAL_SECRET_KEY: &str = "notionSecret";

/// Trait for device-scoped secret storage
///
/// Operations are synchronous and never touch the network.
pub trait LocalSecretStore: Send + Sync {
    /// Read the stored secret, if any
    fn read_secret(&self) -> Result<Option<String>>;

    /// Store the secret, replacing any previous value
    fn write_secret(&self, secret: &str) -> Result<()>;

    /// Remove the stored secret (no-op when nothing is stored)
    fn clear_secret(&self) -> Result<()>;

    /// Get a human-readable name for this store
    fn backend_name(&self) -> &'static str;
}

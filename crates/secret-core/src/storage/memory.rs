//! In-memory local store

use std::sync::Mutex;

use super::LocalSecretStore;
use crate::error::{Result, SecretError};

/// Local store kept in process memory
#[derive(Default)]
pub struct MemorySecretStore {
    value: Mutex<Option<String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a secret
    pub fn with_secret(secret: &str) -> Self {
        Self {
            value: Mutex::new(Some(secret.to_string())),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.value
            .lock()
            .map_err(|_| SecretError::StorageError("Local store lock poisoned".to_string()))
    }
}

impl LocalSecretStore for MemorySecretStore {
    fn read_secret(&self) -> Result<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn write_secret(&self, secret: &str) -> Result<()> {
        if secret.is_empty() {
            return Err(SecretError::InvalidInput("Secret cannot be empty".to_string()));
        }
        *self.slot()? = Some(secret.to_string());
        Ok(())
    }

    fn clear_secret(&self) -> Result<()> {
        self.slot()?.take();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}

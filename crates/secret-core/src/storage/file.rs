//! File-backed local store
//!
//! Keeps a small JSON document in the user's data directory. The secret is
//! stored in plaintext under [`LOCAL_SECRET_KEY`]; the file is restricted to
//! the current user where the platform allows it.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{LocalSecretStore, LOCAL_SECRET_KEY};
use crate::error::{Result, SecretError};

const STORE_FILE_NAME: &str = "local-store.json";

/// File format for persistent storage
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: HashMap<String, String>,
}

/// Local store persisted as a JSON file
pub struct FileSecretStore {
    /// Directory holding the store file
    storage_dir: PathBuf,
    /// Serialises read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileSecretStore {
    /// Create a store in the default data directory
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir()?)
    }

    /// Create with a custom storage directory
    pub fn with_dir(storage_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&storage_dir)?;
        debug!("Local secret store initialized at: {:?}", storage_dir);

        Ok(Self {
            storage_dir,
            lock: Mutex::new(()),
        })
    }

    /// Get the path to the store file
    pub fn file_path(&self) -> PathBuf {
        self.storage_dir.join(STORE_FILE_NAME)
    }

    fn load(&self) -> Result<StoreFile> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(StoreFile {
                version: 1,
                entries: HashMap::new(),
            });
        }

        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, file: &StoreFile) -> Result<()> {
        let contents = serde_json::to_string_pretty(file)?;
        let path = self.file_path();

        // Write atomically using a temp file
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &contents)?;
        restrict_permissions(&temp_path);
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| SecretError::StorageError("Local store lock poisoned".to_string()))
    }
}

impl LocalSecretStore for FileSecretStore {
    fn read_secret(&self) -> Result<Option<String>> {
        let _guard = self.guard()?;
        let file = self.load()?;
        Ok(file.entries.get(LOCAL_SECRET_KEY).cloned())
    }

    fn write_secret(&self, secret: &str) -> Result<()> {
        if secret.is_empty() {
            return Err(SecretError::InvalidInput("Secret cannot be empty".to_string()));
        }

        let _guard = self.guard()?;
        let mut file = self.load()?;
        file.version = 1;
        file.entries
            .insert(LOCAL_SECRET_KEY.to_string(), secret.to_string());
        self.save(&file)?;

        debug!("Stored secret in local store");
        Ok(())
    }

    fn clear_secret(&self) -> Result<()> {
        let _guard = self.guard()?;
        let mut file = self.load()?;

        if file.entries.remove(LOCAL_SECRET_KEY).is_some() {
            self.save(&file)?;
            debug!("Cleared secret from local store");
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Local File"
    }
}

/// Get the default data directory
fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("ai", "open-notion-ai", "open-notion-ai")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| SecretError::StorageError("Could not determine data directory".to_string()))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!("Could not restrict permissions on {:?}: {}", path, e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

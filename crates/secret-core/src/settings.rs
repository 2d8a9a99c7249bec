//! Client settings management
//!
//! Stores non-sensitive configuration in a plain JSON file next to the
//! local store. Nothing secret belongs here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::backend::HttpSecretBackend;
use crate::crypto::{KeyDerivationParams, DEFAULT_ITERATIONS};
use crate::error::{Result, SecretError};
use crate::validation::{NotionHandshakeValidator, PrefixValidator, SecretValidator};

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Settings file version
    pub version: u32,
    /// Base URL of the deployed functions (e.g. "https://<ref>.supabase.co/functions/v1")
    pub functions_url: Option<String>,
    /// Public API key sent as the `apikey` header
    pub anon_key: Option<String>,
    /// Notion API root used for the live handshake
    pub notion_api_url: Option<String>,
    /// Whether connecting also performs a live call to Notion
    pub verify_with_notion: bool,
    /// PBKDF2 iteration count; must match every client sharing saved secrets
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            functions_url: None,
            anon_key: None,
            notion_api_url: None,
            verify_with_notion: false,
            kdf_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl Settings {
    /// Parsed functions base URL
    pub fn functions_base(&self) -> Result<Url> {
        let raw = self
            .functions_url
            .as_deref()
            .ok_or_else(|| SecretError::ConfigError("functionsUrl is not set".to_string()))?;
        Url::parse(raw).map_err(|e| SecretError::ConfigError(format!("Invalid functionsUrl: {}", e)))
    }

    /// Key derivation parameters
    pub fn kdf_params(&self) -> KeyDerivationParams {
        KeyDerivationParams {
            iterations: self.kdf_iterations,
        }
    }

    /// Build the HTTP backend described by these settings
    pub fn backend(&self) -> Result<HttpSecretBackend> {
        let backend = HttpSecretBackend::new(self.functions_base()?);
        Ok(match &self.anon_key {
            Some(key) => backend.with_api_key(key.clone()),
            None => backend,
        })
    }

    /// Build the validator described by these settings
    pub fn validator(&self) -> Result<Arc<dyn SecretValidator>> {
        if !self.verify_with_notion {
            return Ok(Arc::new(PrefixValidator));
        }
        let validator = match &self.notion_api_url {
            Some(url) => NotionHandshakeValidator::with_api_base(url)?,
            None => NotionHandshakeValidator::new()?,
        };
        Ok(Arc::new(validator))
    }
}

/// Settings manager
pub struct SettingsManager {
    settings_file: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Create a new settings manager
    pub fn new(storage_dir: &Path) -> Result<Self> {
        let settings_file = storage_dir.join("settings.json");
        let settings = Self::load_from_file(&settings_file)?;

        Ok(Self {
            settings_file,
            settings,
        })
    }

    /// Load settings from file
    fn load_from_file(path: &Path) -> Result<Settings> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub async fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.settings)?;

        // Write atomically using temp file
        let temp_path = self.settings_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.settings_file).await?;

        debug!("Saved settings to {:?}", self.settings_file);
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Update settings and save
    pub async fn update(&mut self, settings: Settings) -> Result<()> {
        if settings.kdf_iterations == 0 {
            return Err(SecretError::ConfigError(
                "kdfIterations must be positive".to_string(),
            ));
        }
        self.settings = settings;
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SettingsManager::new(temp_dir.path()).unwrap();

        let settings = manager.get();
        assert_eq!(settings.kdf_iterations, 100_000);
        assert!(!settings.verify_with_notion);
        assert!(settings.functions_base().is_err());
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut manager = SettingsManager::new(temp_dir.path()).unwrap();
            let settings = Settings {
                functions_url: Some("https://ref.supabase.co/functions/v1".to_string()),
                anon_key: Some("anon".to_string()),
                ..Settings::default()
            };
            manager.update(settings).await.unwrap();
        }

        {
            let manager = SettingsManager::new(temp_dir.path()).unwrap();
            assert_eq!(
                manager.get().functions_base().unwrap().as_str(),
                "https://ref.supabase.co/functions/v1"
            );
            assert_eq!(manager.get().anon_key.as_deref(), Some("anon"));
        }
    }

    #[test]
    fn test_missing_iterations_default() {
        let settings: Settings = serde_json::from_str(
            r#"{"version":1,"functionsUrl":null,"anonKey":null,"notionApiUrl":null,"verifyWithNotion":true}"#,
        )
        .unwrap();
        assert_eq!(settings.kdf_params().iterations, DEFAULT_ITERATIONS);
        assert!(settings.validator().is_ok());
    }

    #[tokio::test]
    async fn test_zero_iterations_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path()).unwrap();

        let result = manager
            .update(Settings {
                kdf_iterations: 0,
                ..Settings::default()
            })
            .await;
        assert!(matches!(result, Err(SecretError::ConfigError(_))));
    }

    #[test]
    fn test_backend_from_settings() {
        let settings = Settings {
            functions_url: Some("https://ref.supabase.co/functions/v1".to_string()),
            ..Settings::default()
        };
        let backend = settings.backend().unwrap();
        assert_eq!(
            backend.endpoint("get-notion-secret").unwrap().as_str(),
            "https://ref.supabase.co/functions/v1/get-notion-secret"
        );
    }
}

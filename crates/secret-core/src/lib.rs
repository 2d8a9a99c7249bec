//! # secret-core
//!
//! Client-side protection of the Notion integration secret:
//! - PBKDF2 key derivation bound to the session credential
//! - AES-256-GCM encryption of the secret before it leaves the device
//! - Cloud store protocol with a local fallback
//! - Connection state machine driving the secret's lifecycle

pub mod backend;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod protocol;
pub mod session;
pub mod settings;
pub mod storage;
pub mod validation;

pub use backend::{HttpSecretBackend, SecretBackend};
pub use connection::{
    ConnectionError, ConnectionSnapshot, ConnectionState, ConnectionStatus, SaveOutcome,
    SecretConnector, SecretSource,
};
pub use crypto::{
    decrypt_secret, derive_key, encrypt_secret, open_secret, seal_secret, KeyDerivationParams,
    SecretKey, SecretString,
};
pub use error::{ErrorKind, Result, SecretError};
pub use session::SessionCredential;
pub use settings::{Settings, SettingsManager};
pub use storage::{FileSecretStore, LocalSecretStore, MemorySecretStore};
pub use validation::{NotionHandshakeValidator, PrefixValidator, SecretValidator};

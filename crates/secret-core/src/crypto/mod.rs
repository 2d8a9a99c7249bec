//! Cryptographic primitives for protecting the integration secret
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA256 key derivation from a session credential
//! - AES-256-GCM authenticated encryption into a self-contained base64 blob
//! - Secure memory handling with zeroize

mod encryption;
mod key_derivation;
mod secure_memory;

pub use encryption::{decrypt_secret, encrypt_secret, open_secret, seal_secret, IV_LEN};
pub use key_derivation::{derive_key, KeyDerivationParams, DEFAULT_ITERATIONS, KEY_MATERIAL_CHARS};
pub use secure_memory::{SecretKey, SecretString, KEY_LEN};

//! Session-credential based key derivation using PBKDF2-HMAC-SHA256
//!
//! The key is re-derived from the session credential whenever it is needed,
//! so it never has to be persisted. Only the first [`KEY_MATERIAL_CHARS`]
//! characters of the credential are used as key material.
//!
//! The salt is fixed. This gives up the usual per-user salt: the credential
//! fragment is the only secret input, so equal fragments give equal keys.
//! It is accepted here because the derived key only guards data that is
//! already reachable by whoever holds a valid session credential.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::SecretKey;
use crate::error::{Result, SecretError};

/// Fixed salt mixed into every derivation
const DERIVATION_SALT: &[u8] = b"open-notion-ai-salt";

/// Default PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Number of leading credential characters used as key material
pub const KEY_MATERIAL_CHARS: usize = 32;

/// Parameters for PBKDF2 key derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDerivationParams {
    /// Iteration count (default: 100 000)
    pub iterations: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive a 256-bit key from a session credential
///
/// # Arguments
/// * `credential` - The bearer credential of the current session
/// * `params` - Optional key derivation parameters
///
/// # Returns
/// A 32-byte key suitable for AES-256-GCM
pub fn derive_key(credential: &str, params: Option<&KeyDerivationParams>) -> Result<SecretKey> {
    if credential.is_empty() {
        return Err(SecretError::InvalidInput(
            "Session credential is required for key derivation".to_string(),
        ));
    }

    let iterations = params.map_or(DEFAULT_ITERATIONS, |p| p.iterations);
    if iterations == 0 {
        return Err(SecretError::InvalidInput(
            "Iteration count must be positive".to_string(),
        ));
    }

    let material: Zeroizing<String> =
        Zeroizing::new(credential.chars().take(KEY_MATERIAL_CHARS).collect());

    let mut key_bytes = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(
        material.as_bytes(),
        DERIVATION_SALT,
        iterations,
        &mut key_bytes[..],
    );

    Ok(SecretKey::new(*key_bytes))
}

//! AES-256-GCM authenticated encryption of the integration secret
//!
//! Blob format: `base64(iv || ciphertext)`
//! - IV: 12 bytes (96 bits), fresh from the OS RNG on every call
//! - Ciphertext: variable length, with the 16-byte GCM tag appended
//!
//! The blob is self-contained, so nothing besides the key is needed to
//! decrypt it.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{rngs::OsRng, RngCore};
use tracing::debug;

use super::{derive_key, KeyDerivationParams, SecretKey};
use crate::error::{Result, SecretError};

/// IV length for AES-GCM
pub const IV_LEN: usize = 12;

/// GCM authentication tag length
const TAG_LEN: usize = 16;

/// Encrypt a secret and return the base64 blob
///
/// # Arguments
/// * `plaintext` - The secret to encrypt, must not be empty
/// * `key` - The 256-bit encryption key
pub fn encrypt_secret(plaintext: &str, key: &SecretKey) -> Result<String> {
    if plaintext.is_empty() {
        return Err(SecretError::InvalidInput("Secret cannot be empty".to_string()));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| SecretError::EncryptionError(e.to_string()))?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    // aes-gcm appends the auth tag to the ciphertext
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| SecretError::EncryptionError(e.to_string()))?;

    let mut combined = Vec::with_capacity(IV_LEN + ciphertext.len());
    combined.extend_from_slice(&iv);
    combined.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(combined))
}

/// Decrypt a base64 blob produced by [`encrypt_secret`]
///
/// Any failure after input validation collapses into
/// [`SecretError::DecryptionFailed`].
pub fn decrypt_secret(blob: &str, key: &SecretKey) -> Result<String> {
    if blob.is_empty() {
        return Err(SecretError::InvalidInput(
            "Encrypted data cannot be empty".to_string(),
        ));
    }

    let combined = BASE64.decode(blob.trim()).map_err(|e| {
        debug!("Blob is not valid base64: {}", e);
        SecretError::DecryptionFailed
    })?;

    if combined.len() < IV_LEN + TAG_LEN {
        debug!("Blob too short: {} bytes", combined.len());
        return Err(SecretError::DecryptionFailed);
    }

    let (iv, ciphertext) = combined.split_at(IV_LEN);

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| SecretError::DecryptionFailed)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| SecretError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| SecretError::DecryptionFailed)
}

/// Derive the key from a session credential and encrypt the secret
pub fn seal_secret(
    plaintext: &str,
    credential: &str,
    params: Option<&KeyDerivationParams>,
) -> Result<String> {
    if plaintext.is_empty() {
        return Err(SecretError::InvalidInput("Secret cannot be empty".to_string()));
    }
    let key = derive_key(credential, params)?;
    encrypt_secret(plaintext, &key)
}

/// Derive the key from a session credential and decrypt the blob
pub fn open_secret(
    blob: &str,
    credential: &str,
    params: Option<&KeyDerivationParams>,
) -> Result<String> {
    if blob.is_empty() {
        return Err(SecretError::InvalidInput(
            "Encrypted data cannot be empty".to_string(),
        ));
    }
    let key = derive_key(credential, params)?;
    decrypt_secret(blob, &key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KeyDerivationParams {
        KeyDerivationParams { iterations: 1_000 }
    }

    fn key_for(credential: &str) -> SecretKey {
        derive_key(credential, Some(&params())).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = key_for("session-a");
        for plaintext in ["ntn_abc123", "secret_Zq9", "ü ünïcødé ✓", "x".repeat(4096).as_str()] {
            let blob = encrypt_secret(plaintext, &key).unwrap();
            assert_eq!(decrypt_secret(&blob, &key).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_blob_layout() {
        let key = key_for("session-a");
        let blob = encrypt_secret("ntn_abc", &key).unwrap();
        let raw = BASE64.decode(&blob).unwrap();

        assert_eq!(raw.len(), IV_LEN + "ntn_abc".len() + TAG_LEN);
    }

    #[test]
    fn test_different_ivs_produce_different_blobs() {
        let key = key_for("session-a");

        let blob1 = encrypt_secret("same plaintext", &key).unwrap();
        let blob2 = encrypt_secret("same plaintext", &key).unwrap();

        assert_ne!(blob1, blob2);
        let raw1 = BASE64.decode(&blob1).unwrap();
        let raw2 = BASE64.decode(&blob2).unwrap();
        assert_ne!(raw1[..IV_LEN], raw2[..IV_LEN]);
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let blob = encrypt_secret("ntn_secret", &key_for("session-a")).unwrap();
        let result = decrypt_secret(&blob, &key_for("session-b"));

        assert!(matches!(result, Err(SecretError::DecryptionFailed)));
    }

    #[test]
    fn test_every_flipped_bit_is_detected() {
        let key = key_for("session-a");
        let blob = encrypt_secret("ntn_tamper", &key).unwrap();
        let raw = BASE64.decode(&blob).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt_secret(&BASE64.encode(&tampered), &key);
                assert!(
                    matches!(result, Err(SecretError::DecryptionFailed)),
                    "bit {bit} of byte {byte} went undetected"
                );
            }
        }
    }

    #[test]
    fn test_rederived_key_interoperates() {
        let blob = encrypt_secret("ntn_xyz", &key_for("same-session-token")).unwrap();
        let plaintext = decrypt_secret(&blob, &key_for("same-session-token")).unwrap();

        assert_eq!(plaintext, "ntn_xyz");
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let key = key_for("session-a");

        assert!(matches!(
            encrypt_secret("", &key),
            Err(SecretError::InvalidInput(_))
        ));
        assert!(matches!(
            decrypt_secret("", &key),
            Err(SecretError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_blobs_fail_generically() {
        let key = key_for("session-a");

        for blob in ["not base64!!", "AAAA", BASE64.encode([0u8; IV_LEN + TAG_LEN - 1]).as_str()] {
            assert!(matches!(
                decrypt_secret(blob, &key),
                Err(SecretError::DecryptionFailed)
            ));
        }
    }

    #[test]
    fn test_seal_and_open_with_credential() {
        let blob = seal_secret("ntn_sealed", "bearer-token", Some(&params())).unwrap();
        let opened = open_secret(&blob, "bearer-token", Some(&params())).unwrap();
        assert_eq!(opened, "ntn_sealed");

        let wrong = open_secret(&blob, "another-bearer", Some(&params()));
        assert!(matches!(wrong, Err(SecretError::DecryptionFailed)));
    }

    #[test]
    fn test_seal_requires_credential() {
        let result = seal_secret("ntn_x", "", Some(&params()));
        assert!(matches!(result, Err(SecretError::InvalidInput(_))));
    }
}

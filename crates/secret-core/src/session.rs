//! Session credential issued by the hosted authentication provider
//!
//! The credential is an opaque bearer string. It is only ever used to
//! authenticate backend calls and as key-derivation input; this crate never
//! persists it.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{derive_key, KeyDerivationParams, SecretKey};
use crate::error::{Result, SecretError};

/// Bearer credential of an authenticated session
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
}

impl SessionCredential {
    /// Wrap a bearer token, rejecting blank values
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SecretError::InvalidInput(
                "Session credential cannot be empty".to_string(),
            ));
        }
        Ok(Self { token })
    }

    /// Get the raw bearer token (use carefully)
    pub fn expose(&self) -> &str {
        &self.token
    }

    /// Value for an `Authorization` header
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Derive the symmetric key bound to this session
    pub fn derive_key(&self, params: &KeyDerivationParams) -> Result<SecretKey> {
        derive_key(&self.token, Some(params))
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

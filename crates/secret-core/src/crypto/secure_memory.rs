//! Key and plaintext wrappers that wipe themselves on drop

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// Symmetric key derived from a session credential
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes, only for handing to the cipher
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Integration secret held in memory while it is active
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

macro_rules! redacted_debug {
    ($($name:ident),+) => {
        $(
            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(concat!(stringify!($name), "(<redacted>)"))
                }
            }
        )+
    };
}

redacted_debug!(SecretKey, SecretString);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose() {
        let secret = SecretString::new("ntn_abc123".to_string());
        assert_eq!(secret.expose(), "ntn_abc123");
    }

    #[test]
    fn test_debug_hides_contents() {
        assert_eq!(format!("{:?}", SecretKey::new([7u8; KEY_LEN])), "SecretKey(<redacted>)");
        assert_eq!(
            format!("{:?}", SecretString::from("ntn_visible")),
            "SecretString(<redacted>)"
        );
    }

    #[test]
    fn test_zeroize_clears_key() {
        let mut key = SecretKey::new([9u8; KEY_LEN]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }
}

//! Error types for secret-core

use thiserror::Error;

/// Result type alias for secret operations
pub type Result<T> = std::result::Result<T, SecretError>;

/// Secret protection error types
#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Deliberately carries no detail about why verification failed
    #[error("Failed to decrypt secret. The key might be incorrect or data corrupted.")]
    DecryptionFailed,

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Secret validation failed: {0}")]
    ValidationFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Coarse error category, used by the presentation layer to pick a reaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    AuthenticationFailed,
    DecryptionFailed,
    BackendUnavailable,
    ValidationFailed,
    Internal,
}

impl SecretError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::DecryptionFailed => ErrorKind::DecryptionFailed,
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::EncryptionError(_)
            | Self::StorageError(_)
            | Self::ConfigError(_)
            | Self::IoError(_)
            | Self::SerializationError(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same request may succeed if repeated later
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::BackendUnavailable
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthenticationFailed(_) => {
                "Your session has expired. Please log in again.".to_string()
            }
            Self::DecryptionFailed => {
                "Could not load saved secret, please enter it manually.".to_string()
            }
            Self::BackendUnavailable(_) => {
                "The server could not be reached. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SecretError::InvalidInput("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(SecretError::DecryptionFailed.kind(), ErrorKind::DecryptionFailed);
        assert_eq!(
            SecretError::StorageError("disk".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_only_backend_errors_are_retryable() {
        assert!(SecretError::BackendUnavailable("timeout".into()).is_retryable());
        assert!(!SecretError::AuthenticationFailed("expired".into()).is_retryable());
        assert!(!SecretError::DecryptionFailed.is_retryable());
    }

    #[test]
    fn test_decryption_message_is_generic() {
        let message = SecretError::DecryptionFailed.user_message();
        assert!(message.contains("enter it manually"));
        assert!(!SecretError::DecryptionFailed.to_string().contains("tag"));
    }
}

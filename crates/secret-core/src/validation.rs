//! Checks that a submitted value looks like a usable Notion integration secret

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::{Result, SecretError};

/// Prefixes of Notion internal-integration tokens
pub const NOTION_SECRET_PREFIXES: [&str; 2] = ["ntn_", "secret_"];

const NOTION_API_BASE: &str = "https://api.notion.com/v1/";
const NOTION_VERSION: &str = "2022-06-28";

/// Gate for the `Connecting -> Connected` transition
#[async_trait]
pub trait SecretValidator: Send + Sync {
    /// Fails with [`SecretError::ValidationFailed`] when the secret is unusable
    async fn validate(&self, secret: &str) -> Result<()>;
}

/// Format-only check against the known token prefixes
#[derive(Debug, Clone, Default)]
pub struct PrefixValidator;

impl PrefixValidator {
    pub fn check(secret: &str) -> Result<()> {
        if secret.trim().is_empty() {
            return Err(SecretError::InvalidInput(
                "Notion secret cannot be empty".to_string(),
            ));
        }
        if secret.trim() != secret {
            return Err(SecretError::ValidationFailed(
                "Notion secret must not contain surrounding whitespace".to_string(),
            ));
        }
        if !NOTION_SECRET_PREFIXES
            .iter()
            .any(|prefix| secret.starts_with(prefix))
        {
            return Err(SecretError::ValidationFailed(
                "Token should start with 'ntn_' or 'secret_'".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SecretValidator for PrefixValidator {
    async fn validate(&self, secret: &str) -> Result<()> {
        Self::check(secret)
    }
}

/// Prefix check followed by a live call to the Notion API
#[derive(Clone)]
pub struct NotionHandshakeValidator {
    client: Client,
    api_base: Url,
}

impl NotionHandshakeValidator {
    pub fn new() -> Result<Self> {
        Self::with_api_base(NOTION_API_BASE)
    }

    /// Point the handshake at another API root
    pub fn with_api_base(api_base: &str) -> Result<Self> {
        let mut api_base = Url::parse(api_base)
            .map_err(|e| SecretError::ConfigError(format!("Invalid Notion API URL: {}", e)))?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        Ok(Self {
            client: Client::new(),
            api_base,
        })
    }

    fn users_me(&self) -> Result<Url> {
        self.api_base
            .join("users/me")
            .map_err(|e| SecretError::ConfigError(e.to_string()))
    }
}

#[async_trait]
impl SecretValidator for NotionHandshakeValidator {
    async fn validate(&self, secret: &str) -> Result<()> {
        PrefixValidator::check(secret)?;

        let response = self
            .client
            .get(self.users_me()?)
            .bearer_auth(secret)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(|e| SecretError::BackendUnavailable(e.to_string()))?;

        let status = response.status();
        debug!("Notion handshake returned {}", status);

        match status {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SecretError::ValidationFailed(
                "Notion rejected the integration secret".to_string(),
            )),
            s => Err(SecretError::BackendUnavailable(format!(
                "Notion API returned HTTP {}",
                s.as_u16()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header::AUTHORIZATION, HeaderMap, StatusCode as HttpStatus},
        routing::get,
        Router,
    };
    use tokio::net::TcpListener;

    /// Minimal stand-in for `GET /v1/users/me`
    async fn users_me(headers: HeaderMap) -> HttpStatus {
        if headers.get("Notion-Version").and_then(|v| v.to_str().ok()) != Some(NOTION_VERSION) {
            return HttpStatus::BAD_REQUEST;
        }
        match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some("Bearer ntn_good") => HttpStatus::OK,
            Some("Bearer ntn_forbidden") => HttpStatus::FORBIDDEN,
            Some("Bearer ntn_flaky") => HttpStatus::SERVICE_UNAVAILABLE,
            _ => HttpStatus::UNAUTHORIZED,
        }
    }

    async fn notion_stub() -> NotionHandshakeValidator {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/v1/users/me", get(users_me));
        tokio::spawn(async move { axum::serve(listener, app).await });

        NotionHandshakeValidator::with_api_base(&format!("http://{}/v1", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_accepts_known_prefixes() {
        let validator = PrefixValidator;
        validator.validate("ntn_abc123").await.unwrap();
        validator.validate("secret_Xyz").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_unknown_prefix() {
        let result = PrefixValidator.validate("sk-proj-abc").await;
        assert!(matches!(result, Err(SecretError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_blank_is_invalid_input() {
        let result = PrefixValidator.validate("   ").await;
        assert!(matches!(result, Err(SecretError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_rejected() {
        let result = PrefixValidator.validate(" ntn_abc ").await;
        assert!(matches!(result, Err(SecretError::ValidationFailed(_))));
    }

    #[test]
    fn test_handshake_url() {
        let validator = NotionHandshakeValidator::with_api_base("https://example.test/v1").unwrap();
        assert_eq!(
            validator.users_me().unwrap().as_str(),
            "https://example.test/v1/users/me"
        );
    }

    #[tokio::test]
    async fn test_handshake_checks_prefix_before_network() {
        let validator = NotionHandshakeValidator::with_api_base("http://127.0.0.1:9/v1").unwrap();
        let result = validator.validate("not-a-notion-token").await;
        assert!(matches!(result, Err(SecretError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_handshake_accepts_live_secret() {
        let validator = notion_stub().await;
        validator.validate("ntn_good").await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_rejected_secret() {
        let validator = notion_stub().await;

        let revoked = validator.validate("ntn_revoked").await;
        assert!(matches!(revoked, Err(SecretError::ValidationFailed(_))));

        let forbidden = validator.validate("ntn_forbidden").await;
        assert!(matches!(forbidden, Err(SecretError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_handshake_server_error_is_retryable() {
        let validator = notion_stub().await;

        let error = validator.validate("ntn_flaky").await.unwrap_err();
        assert!(matches!(error, SecretError::BackendUnavailable(_)));
        assert!(error.is_retryable());
    }
}

//! Hosted platform: GoTrue for identity, PostgREST for the secret table

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secret_core::protocol::SecretRecord;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{IdentityProvider, SecretRepository, UserId};
use crate::error::PlatformError;
use crate::schema::SECRETS_TABLE;

#[derive(Deserialize)]
struct AuthUser {
    id: UserId,
}

/// Error body returned by PostgREST and GoTrue
#[derive(Deserialize, Default)]
struct UpstreamError {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default, alias = "msg", alias = "error_description")]
    message: Option<String>,
}

/// Client for the hosted identity service and database
#[derive(Clone)]
pub struct SupabasePlatform {
    client: Client,
    base_url: Url,
    anon_key: String,
    service_role_key: String,
}

impl SupabasePlatform {
    pub fn new(base_url: Url, anon_key: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client: Client::new(),
            base_url,
            anon_key: anon_key.into(),
            service_role_key: service_role_key.into(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, PlatformError> {
        self.base_url
            .join(path)
            .map_err(|e| PlatformError::Upstream(format!("Invalid platform URL: {}", e)))
    }

    fn table_url(&self, filters: &[(&str, String)]) -> Result<Url, PlatformError> {
        let mut url = self.url(&format!("rest/v1/{}", SECRETS_TABLE))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Attach the service-role credentials; row access is scoped by explicit filters
    fn privileged(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn send(request: RequestBuilder) -> Result<Response, PlatformError> {
        request
            .send()
            .await
            .map_err(|e| PlatformError::Upstream(e.to_string()))
    }
}

async fn upstream_error(response: Response) -> UpstreamError {
    response.json::<UpstreamError>().await.unwrap_or_default()
}

fn code_string(code: Option<serde_json::Value>) -> Option<String> {
    match code? {
        serde_json::Value::String(code) => Some(code),
        other => Some(other.to_string()),
    }
}

async fn database_error(response: Response) -> PlatformError {
    let status = response.status();
    let body = upstream_error(response).await;
    PlatformError::Database {
        message: body
            .message
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
        code: code_string(body.code),
    }
}

#[async_trait]
impl IdentityProvider for SupabasePlatform {
    async fn authenticate(&self, bearer: &str) -> Result<UserId, PlatformError> {
        let request = self
            .client
            .get(self.url("auth/v1/user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer);
        let response = Self::send(request).await?;
        let status = response.status();

        if status.is_success() {
            let user: AuthUser = response
                .json()
                .await
                .map_err(|e| PlatformError::Upstream(format!("Invalid user response: {}", e)))?;
            return Ok(user.id);
        }

        let body = upstream_error(response).await;
        let reason = body.message.unwrap_or_else(|| "invalid token".to_string());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => Err(
                PlatformError::Unauthorized(format!("Authentication failed: {}", reason)),
            ),
            s => Err(PlatformError::Upstream(format!(
                "Identity service returned HTTP {}: {}",
                s.as_u16(),
                reason
            ))),
        }
    }

    async fn delete_user(&self, user: UserId) -> Result<(), PlatformError> {
        let url = self.url(&format!("auth/v1/admin/users/{}", user))?;
        let response = Self::send(self.privileged(self.client.delete(url))).await?;

        if response.status().is_success() {
            debug!("Deleted user {}", user);
            return Ok(());
        }

        let status = response.status();
        let body = upstream_error(response).await;
        Err(PlatformError::Upstream(body.message.unwrap_or_else(|| {
            format!("Identity service returned HTTP {}", status.as_u16())
        })))
    }
}

#[async_trait]
impl SecretRepository for SupabasePlatform {
    async fn fetch(&self, user: UserId) -> Result<Option<SecretRecord>, PlatformError> {
        let url = self.table_url(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", user)),
        ])?;
        let response = Self::send(self.privileged(self.client.get(url))).await?;

        if !response.status().is_success() {
            return Err(database_error(response).await);
        }

        // An empty array is the "no rows" case
        let mut rows: Vec<SecretRecord> = response.json().await.map_err(|e| {
            PlatformError::Upstream(format!("Invalid table response: {}", e))
        })?;
        Ok(rows.pop())
    }

    async fn upsert(&self, user: UserId, blob: &str) -> Result<SecretRecord, PlatformError> {
        let url = self.table_url(&[("on_conflict", "user_id".to_string())])?;
        let request = self
            .privileged(self.client.post(url))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&json!({
                "user_id": user,
                "encrypted_notion_secret": blob,
            }));
        let response = Self::send(request).await?;

        if !response.status().is_success() {
            return Err(database_error(response).await);
        }

        let mut rows: Vec<SecretRecord> = response.json().await.map_err(|e| {
            PlatformError::Upstream(format!("Invalid table response: {}", e))
        })?;
        rows.pop().ok_or_else(|| PlatformError::Database {
            message: "Upsert returned no row".to_string(),
            code: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn platform(base: &str) -> SupabasePlatform {
        SupabasePlatform::new(Url::parse(base).unwrap(), "anon", "service")
    }

    #[test]
    fn test_urls() {
        let platform = platform("https://ref.supabase.co");
        assert_eq!(
            platform.url("auth/v1/user").unwrap().as_str(),
            "https://ref.supabase.co/auth/v1/user"
        );

        let user = Uuid::nil();
        let url = platform
            .table_url(&[("user_id", format!("eq.{}", user))])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ref.supabase.co/rest/v1/user_notion_secrets?user_id=eq.00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_base_path_preserved() {
        let platform = platform("http://localhost:54321/project");
        assert_eq!(
            platform.url("auth/v1/user").unwrap().as_str(),
            "http://localhost:54321/project/auth/v1/user"
        );
    }

    #[test]
    fn test_code_string() {
        assert_eq!(code_string(Some(json!("42501"))).as_deref(), Some("42501"));
        assert_eq!(code_string(Some(json!(400))).as_deref(), Some("400"));
        assert_eq!(code_string(None), None);
    }

    #[tokio::test]
    async fn test_unreachable_platform() {
        let platform = platform("http://127.0.0.1:9");
        let result = platform.authenticate("token").await;
        assert!(matches!(result, Err(PlatformError::Upstream(_))));
    }
}

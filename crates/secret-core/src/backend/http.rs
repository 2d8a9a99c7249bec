//! HTTP implementation of [`SecretBackend`] against the deployed functions

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::SecretBackend;
use crate::error::{Result, SecretError};
use crate::protocol::{
    ErrorResponse, FetchSecretResponse, MessageResponse, SaveSecretRequest, DELETE_ACCOUNT_PATH,
    GET_SECRET_PATH, SAVE_SECRET_PATH,
};
use crate::session::SessionCredential;

/// Calls the save/fetch/delete functions over HTTP
#[derive(Clone)]
pub struct HttpSecretBackend {
    client: Client,
    functions_url: Url,
    api_key: Option<String>,
}

impl HttpSecretBackend {
    /// Create a backend for the given functions base URL
    pub fn new(functions_url: Url) -> Self {
        Self {
            client: Client::new(),
            functions_url: with_trailing_slash(functions_url),
            api_key: None,
        }
    }

    /// Send the platform's public API key with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Full URL of a function
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.functions_url
            .join(path)
            .map_err(|e| SecretError::ConfigError(format!("Invalid function URL: {}", e)))
    }

    fn post(&self, path: &str, credential: &SessionCredential) -> Result<RequestBuilder> {
        let mut request = self
            .client
            .post(self.endpoint(path)?)
            .bearer_auth(credential.expose());
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| SecretError::BackendUnavailable(e.to_string()))?;
        handle_response(response).await
    }
}

#[async_trait]
impl SecretBackend for HttpSecretBackend {
    async fn fetch_secret(&self, credential: &SessionCredential) -> Result<Option<String>> {
        let request = self.post(GET_SECRET_PATH, credential)?;
        let body: FetchSecretResponse = self.send(request).await?;

        debug!(
            "Fetched cloud secret (present: {})",
            body.encrypted_notion_secret.is_some()
        );
        Ok(body.encrypted_notion_secret.filter(|blob| !blob.is_empty()))
    }

    async fn save_secret(&self, credential: &SessionCredential, blob: &str) -> Result<()> {
        if blob.is_empty() {
            return Err(SecretError::InvalidInput(
                "Encrypted secret cannot be empty".to_string(),
            ));
        }

        let request = self
            .post(SAVE_SECRET_PATH, credential)?
            .json(&SaveSecretRequest {
                encrypted_notion_secret: blob.to_string(),
            });
        let body: MessageResponse = self.send(request).await?;

        debug!("Cloud save acknowledged: {}", body.message);
        Ok(())
    }

    async fn delete_account(&self, credential: &SessionCredential) -> Result<()> {
        let request = self.post(DELETE_ACCOUNT_PATH, credential)?;
        let body: MessageResponse = self.send(request).await?;

        debug!("Account deletion acknowledged: {}", body.message);
        Ok(())
    }
}

async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| SecretError::BackendUnavailable(format!("Malformed response: {}", e)));
    }

    let message = response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));

    Err(map_status(status, message))
}

fn map_status(status: StatusCode, message: String) -> SecretError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SecretError::AuthenticationFailed(message)
        }
        StatusCode::BAD_REQUEST => SecretError::InvalidInput(message),
        _ => {
            warn!("Backend returned {}: {}", status, message);
            SecretError::BackendUnavailable(message)
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn backend(base: &str) -> HttpSecretBackend {
        HttpSecretBackend::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let plain = backend("https://project.supabase.co/functions/v1");
        assert_eq!(
            plain.endpoint(SAVE_SECRET_PATH).unwrap().as_str(),
            "https://project.supabase.co/functions/v1/save-notion-secret"
        );

        let slashed = backend("https://project.supabase.co/functions/v1/");
        assert_eq!(
            slashed.endpoint(GET_SECRET_PATH).unwrap().as_str(),
            "https://project.supabase.co/functions/v1/get-notion-secret"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_status(StatusCode::UNAUTHORIZED, "expired".into()).kind(),
            ErrorKind::AuthenticationFailed
        );
        assert_eq!(
            map_status(StatusCode::BAD_REQUEST, "missing".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            map_status(StatusCode::INTERNAL_SERVER_ERROR, "db".into()).kind(),
            ErrorKind::BackendUnavailable
        );
        assert_eq!(
            map_status(StatusCode::BAD_GATEWAY, "gw".into()).kind(),
            ErrorKind::BackendUnavailable
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let backend = backend("http://127.0.0.1:9/functions/v1");
        let credential = SessionCredential::new("token").unwrap();

        let result = backend.fetch_secret(&credential).await;
        assert!(matches!(result, Err(SecretError::BackendUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_blob_rejected_before_network() {
        let backend = backend("http://127.0.0.1:9/functions/v1");
        let credential = SessionCredential::new("token").unwrap();

        let result = backend.save_secret(&credential, "").await;
        assert!(matches!(result, Err(SecretError::InvalidInput(_))));
    }
}

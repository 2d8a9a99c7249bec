//! HTTP surface of the backend functions

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        HeaderName, HeaderValue, Method,
    },
    routing::{get, post},
    Json, Router,
};
use secret_core::protocol::{
    FetchSecretResponse, MessageResponse, DELETE_ACCOUNT_PATH, GET_SECRET_PATH, SAVE_SECRET_PATH,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::platform::{IdentityProvider, SecretRepository, UserId};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub secrets: Arc<dyn SecretRepository>,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityProvider>, secrets: Arc<dyn SecretRepository>) -> Self {
        Self { identity, secrets }
    }

    /// Use one platform for both seams
    pub fn from_platform<P>(platform: Arc<P>) -> Self
    where
        P: IdentityProvider + SecretRepository + 'static,
    {
        Self {
            identity: platform.clone(),
            secrets: platform,
        }
    }
}

/// Caller resolved from the `Authorization: Bearer` header
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("User not authenticated".into()))?;

        let user = state.identity.authenticate(token).await?;
        Ok(AuthenticatedUser(user))
    }
}

/// CORS policy for browser callers
///
/// `None` allows any origin, which is only meant for development.
pub fn cors_layer(allowed_origin: Option<HeaderValue>) -> CorsLayer {
    let origin = match allowed_origin {
        // Only a matching request origin is echoed back
        Some(origin) => AllowOrigin::list([origin]),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            CONTENT_TYPE,
            ACCEPT,
        ])
}

/// Build the router
pub fn router(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(&route_path(SAVE_SECRET_PATH), post(save_secret))
        .route(
            &route_path(GET_SECRET_PATH),
            get(fetch_secret).post(fetch_secret),
        )
        .route(&route_path(DELETE_ACCOUNT_PATH), post(delete_account))
        .layer(cors_layer(allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn route_path(function: &str) -> String {
    format!("/{}", function)
}

/// Health check endpoint
async fn health() -> &'static str {
    "OK"
}

/// Pull a non-empty `encryptedNotionSecret` string out of a raw body
fn parse_blob(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("encryptedNotionSecret")?
        .as_str()
        .filter(|blob| !blob.is_empty())
        .map(str::to_owned)
}

async fn save_secret(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let blob = parse_blob(&body)
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid encryptedNotionSecret".into()))?;

    state
        .secrets
        .upsert(user, &blob)
        .await
        .map_err(|e| ApiError::from(e).during("save"))?;

    info!("Notion secret saved for user {}", user);
    Ok(Json(MessageResponse {
        message: "Notion secret saved successfully".to_string(),
    }))
}

async fn fetch_secret(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<FetchSecretResponse>, ApiError> {
    let record = state
        .secrets
        .fetch(user)
        .await
        .map_err(|e| ApiError::from(e).during("fetch"))?;

    debug!(
        "Notion secret lookup for user {} (found: {})",
        user,
        record.is_some()
    );
    Ok(Json(FetchSecretResponse {
        encrypted_notion_secret: record.map(|record| record.encrypted_secret),
    }))
}

async fn delete_account(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.identity.delete_user(user).await?;

    info!("User {} deleted", user);
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blob() {
        assert_eq!(
            parse_blob(br#"{"encryptedNotionSecret":"abc"}"#).as_deref(),
            Some("abc")
        );
        assert!(parse_blob(br#"{"encryptedNotionSecret":""}"#).is_none());
        assert!(parse_blob(br#"{"encryptedNotionSecret":42}"#).is_none());
        assert!(parse_blob(br#"{"other":"abc"}"#).is_none());
        assert!(parse_blob(b"not json").is_none());
        assert!(parse_blob(b"").is_none());
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(route_path(SAVE_SECRET_PATH), "/save-notion-secret");
        assert_eq!(route_path(GET_SECRET_PATH), "/get-notion-secret");
        assert_eq!(route_path(DELETE_ACCOUNT_PATH), "/delete-user-account");
    }
}

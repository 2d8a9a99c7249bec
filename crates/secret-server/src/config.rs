//! Server configuration

use axum::http::HeaderValue;
use std::sync::Arc;
use url::Url;

use crate::error::ServerError;
use crate::platform::{MemoryPlatform, SupabasePlatform};
use crate::routes::AppState;

/// Front-end origin of the production deployment
pub const PRODUCTION_ORIGIN: &str = "https://open-notion-ai.vercel.app";

/// Which platform backs the handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformConfig {
    /// In-process identity and storage, lost on exit
    InMemory,
    Supabase {
        url: String,
        anon_key: String,
        service_role_key: String,
    },
}

/// Runtime configuration of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Allowed CORS origin; `None` allows any
    pub allowed_origin: Option<String>,
    pub platform: PlatformConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            allowed_origin: Some(PRODUCTION_ORIGIN.to_string()),
            platform: PlatformConfig::InMemory,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Parsed CORS origin
    pub fn origin_header(&self) -> Result<Option<HeaderValue>, ServerError> {
        self.allowed_origin
            .as_deref()
            .filter(|origin| *origin != "*")
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|e| ServerError::Config(format!("Invalid allowed origin: {}", e)))
            })
            .transpose()
    }

    /// Build handler state for the configured platform
    pub fn build_state(&self) -> Result<AppState, ServerError> {
        match &self.platform {
            PlatformConfig::InMemory => Ok(AppState::from_platform(Arc::new(MemoryPlatform::new()))),
            PlatformConfig::Supabase {
                url,
                anon_key,
                service_role_key,
            } => {
                let url = Url::parse(url)
                    .map_err(|e| ServerError::Config(format!("Invalid SUPABASE_URL: {}", e)))?;
                let platform = SupabasePlatform::new(url, anon_key.clone(), service_role_key.clone());
                Ok(AppState::from_platform(Arc::new(platform)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_restricts_origin() {
        let config = ServerConfig::default();
        assert_eq!(
            config.origin_header().unwrap().unwrap(),
            HeaderValue::from_static(PRODUCTION_ORIGIN)
        );
        assert_eq!(config.bind_addr(), "0.0.0.0:8787");
    }

    #[test]
    fn test_wildcard_origin_means_any() {
        let config = ServerConfig {
            allowed_origin: Some("*".to_string()),
            ..ServerConfig::default()
        };
        assert!(config.origin_header().unwrap().is_none());
    }

    #[test]
    fn test_invalid_origin() {
        let config = ServerConfig {
            allowed_origin: Some("bad\norigin".to_string()),
            ..ServerConfig::default()
        };
        assert!(matches!(config.origin_header(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_invalid_platform_url() {
        let config = ServerConfig {
            platform: PlatformConfig::Supabase {
                url: "not a url".to_string(),
                anon_key: "anon".to_string(),
                service_role_key: "service".to_string(),
            },
            ..ServerConfig::default()
        };
        assert!(config.build_state().is_err());
    }
}

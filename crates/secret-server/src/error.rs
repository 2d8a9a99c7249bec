//! Error types for secret-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use secret_core::protocol::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Failure reported by an identity provider or secret repository
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Database {
        message: String,
        code: Option<String>,
    },

    #[error("Upstream request failed: {0}")]
    Upstream(String),
}

/// Handler error, rendered as `{error, code?}` JSON
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Database {
        message: String,
        code: Option<String>,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Prefix a database failure with the operation it happened in
    pub fn during(self, operation: &str) -> Self {
        match self {
            ApiError::Database { message, code } => ApiError::Database {
                message: format!("Database error during {}: {}", operation, message),
                code: Some(code.unwrap_or_else(|| "UNKNOWN".to_string())),
            },
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let code = match &self {
            ApiError::Database { code, .. } => code.clone(),
            _ => None,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code,
        });
        (status, body).into_response()
    }
}

impl From<PlatformError> for ApiError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            PlatformError::Database { message, code } => ApiError::Database { message, code },
            PlatformError::Upstream(msg) => ApiError::Internal(msg),
        }
    }
}

/// Startup failure of the server binary
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

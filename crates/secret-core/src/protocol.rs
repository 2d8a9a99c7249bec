//! Wire types shared by the backend functions and their client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Path of the save function
pub const SAVE_SECRET_PATH: &str = "save-notion-secret";
/// Path of the fetch function
pub const GET_SECRET_PATH: &str = "get-notion-secret";
/// Path of the account deletion function
pub const DELETE_ACCOUNT_PATH: &str = "delete-user-account";

/// Body of a save request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSecretRequest {
    pub encrypted_notion_secret: String,
}

/// Body of a fetch response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSecretResponse {
    pub encrypted_notion_secret: Option<String>,
}

/// Success body carrying a human-readable message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body returned by every function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Persisted encrypted secret, one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub user_id: Uuid,
    #[serde(rename = "encrypted_notion_secret")]
    pub encrypted_secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

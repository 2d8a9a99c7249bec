//! # secret-server
//!
//! Backend functions for the encrypted Notion secret. The server only ever
//! sees ciphertext; encryption and decryption happen on the client.

pub mod config;
pub mod error;
pub mod platform;
pub mod routes;
pub mod schema;
mod server;

pub use config::{PlatformConfig, ServerConfig};
pub use error::{ApiError, PlatformError, ServerError};
pub use platform::{IdentityProvider, MemoryPlatform, SecretRepository, SupabasePlatform, UserId};
pub use routes::{router, AppState, AuthenticatedUser};
pub use schema::SCHEMA_SQL;
pub use server::SecretServer;

//! Device-local persistence for the plaintext integration secret
//!
//! This module provides two local stores:
//! 1. JSON file in the user's data directory
//! 2. In-memory store (tests and session-only use)

mod traits;
mod file;
mod memory;

pub use traits::{LocalSecretStore, LOCAL_SECRET_KEY};
pub use file::FileSecretStore;
pub use memory::MemorySecretStore;

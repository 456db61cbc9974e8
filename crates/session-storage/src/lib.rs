//! Session state model and persistence for the signer-backed auth coordinator.
//!
//! This crate provides:
//! - The persisted `AuthState` record and its session payload types
//! - `SessionStore`, a copy-on-write owner of the current state
//! - `SecureStorage` backends: in-memory and a JSON file

mod file;
mod keys;
mod memory;
mod model;
mod store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use model::{AuthState, SessionData, SessionProfile};
pub use store::SessionStore;
pub use traits::SecureStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

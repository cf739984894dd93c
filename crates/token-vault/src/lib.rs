//! Token storage for the merchant session tools.
//!
//! Two backends are provided:
//! - **File**: a single JSON file, written atomically with owner-only permissions
//! - **Memory**: process-local, used for ephemeral sessions and tests
//!
//! [`TokenStore`] sits on top of either and owns the access/refresh token keys.

mod file;
mod keys;
mod memory;
mod token_store;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use token_store::{TokenPair, TokenStore};
pub use traits::KeyValueStorage;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Token file could not be parsed or serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create file-backed storage at `path`.
pub fn create_storage(path: &Path) -> StorageResult<Box<dyn KeyValueStorage>> {
    if path.is_dir() {
        return Err(StorageError::Platform(format!(
            "token path {} is a directory",
            path.display()
        )));
    }
    Ok(Box::new(FileStorage::new(path)))
}

/// Create a TokenStore over file-backed storage at `path`.
pub fn create_token_store(path: &Path) -> StorageResult<TokenStore> {
    let storage = create_storage(path)?;
    Ok(TokenStore::new(storage))
}

//! Session token persistence.

use crate::{KeyValueStorage, MemoryStorage, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info};

/// Access and refresh token issued together by the auth service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens are bearer credentials; keep them out of logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("refresh_token", &format_args!("<{} bytes>", self.refresh_token.len()))
            .finish()
    }
}

/// Durable store for the current session's tokens.
///
/// Multi-key updates are committed under one lock so readers never see an
/// access token from one pair next to a refresh token from another.
pub struct TokenStore {
    storage: Box<dyn KeyValueStorage>,
    write_lock: Mutex<()>,
}

impl TokenStore {
    /// Create a token store over the given storage backend
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Token store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Both tokens, if both are present.
    pub fn pair(&self) -> StorageResult<Option<TokenPair>> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let access = self.storage.get(StorageKeys::ACCESS_TOKEN)?;
        let refresh = self.storage.get(StorageKeys::REFRESH_TOKEN)?;
        Ok(match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Some(TokenPair {
                access_token,
                refresh_token,
            }),
            _ => None,
        })
    }

    /// Whether an access token is stored. Expiry is not checked here.
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::ACCESS_TOKEN)
    }

    /// Replace both tokens, e.g. after a successful login.
    pub fn store_pair(&self, pair: &TokenPair) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.storage.apply(
            &[
                (StorageKeys::ACCESS_TOKEN, pair.access_token.as_str()),
                (StorageKeys::REFRESH_TOKEN, pair.refresh_token.as_str()),
            ],
            &[],
        )?;
        info!("Stored new session tokens");
        Ok(())
    }

    /// Store the result of a token refresh.
    ///
    /// The refresh token is only replaced when the server rotated it;
    /// otherwise the existing one is kept.
    pub fn apply_refresh(&self, access_token: &str, refresh_token: Option<&str>) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match refresh_token {
            Some(refresh) => self.storage.apply(
                &[
                    (StorageKeys::ACCESS_TOKEN, access_token),
                    (StorageKeys::REFRESH_TOKEN, refresh),
                ],
                &[],
            )?,
            None => self.storage.set(StorageKeys::ACCESS_TOKEN, access_token)?,
        }
        debug!(rotated = refresh_token.is_some(), "Applied refreshed tokens");
        Ok(())
    }

    /// Remove both tokens. Idempotent.
    pub fn clear(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.storage.apply(&[], &StorageKeys::ALL)?;
        info!("Cleared session tokens");
        Ok(())
    }
}

//! CLI command implementations.

mod auth;
mod watch;

pub use auth::{login, logout, refresh, status};
pub use watch::watch;

use crate::output::OutputFormat;
use anyhow::Result;
use session_config::{Config, Paths};
use session_keeper::SessionKeeper;
use std::sync::Arc;
use token_vault::{create_token_store, TokenStore};

/// Everything a command needs, resolved once at startup.
pub struct Context {
    pub config: Config,
    pub paths: Paths,
    pub format: OutputFormat,
    pub ephemeral: bool,
}

impl Context {
    /// Open the token store: the tokens file, or memory with `--ephemeral`.
    pub fn open_store(&self) -> Result<Arc<TokenStore>> {
        if self.ephemeral {
            return Ok(Arc::new(TokenStore::in_memory()));
        }
        Ok(Arc::new(create_token_store(&self.paths.tokens_file())?))
    }

    /// Build a session keeper over the token store.
    pub fn keeper(&self) -> Result<SessionKeeper> {
        let store = self.open_store()?;
        Ok(SessionKeeper::from_config(&self.config, store)?)
    }
}

//! File system locations used by the session tools.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name created under the user's home directory.
const BASE_DIR_NAME: &str = ".merchant-session";
/// Persisted token store filename.
const TOKENS_FILE_NAME: &str = "tokens.json";

/// Resolves every path the session tools read or write.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.merchant-session)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.merchant-session`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (`<base>/config.json`).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the persisted token store path (`<base>/tokens.json`).
    pub fn tokens_file(&self) -> PathBuf {
        self.base_dir.join(TOKENS_FILE_NAME)
    }

    /// Get the logs directory (`<base>/logs`).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the JSONL log file path (`<base>/logs/session.jsonl`).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("session.jsonl")
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

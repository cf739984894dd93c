//! Errors raised while loading settings and resolving session paths.

use thiserror::Error;

/// Failure to produce a usable [`Config`](crate::Config) or [`Paths`](crate::Paths).
#[derive(Error, Debug)]
pub enum CoreError {
    /// A setting is present but unusable, e.g. a zero refresh timing
    #[error("Invalid session config: {0}")]
    Config(String),

    /// `config.json` or the session directory could not be read or created
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The API base URL does not parse
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// `config.json` is not valid JSON for [`Config`](crate::Config)
    #[error("Malformed config.json: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to root `~/.merchant-session` in
    #[error("Cannot locate session directory: {0}")]
    Path(String),
}

/// Result alias for config and path operations.
pub type CoreResult<T> = Result<T, CoreError>;

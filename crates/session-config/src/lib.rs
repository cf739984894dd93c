//! Configuration, paths, and logging setup for the merchant session tools.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    resolve_api_url, Config, DeployEnv, OtpSettings, RefreshSettings, API_URL_VAR,
    DEFAULT_API_URL, DEFAULT_LOG_LEVEL, DEPLOY_ENV_VAR,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;

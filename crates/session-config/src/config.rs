//! Configuration management for the session tools.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Built-in API base URL, used when no environment variable supplies one.
pub const DEFAULT_API_URL: &str = "https://api.merchant-dashboard.dev";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable holding the deployment tag.
pub const DEPLOY_ENV_VAR: &str = "MERCHANT_ENV";

/// Generic API URL variable, consulted after the tag-specific one.
pub const API_URL_VAR: &str = "MERCHANT_API_URL";

const LOG_LEVEL_VAR: &str = "MERCHANT_LOG_LEVEL";

/// 3.5 hours: tuned for the backend's four-hour access token lifetime.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 12_600;
const DEFAULT_EXPIRY_HORIZON_SECS: u64 = 1_800;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ADAPTIVE_MIN_DELAY_SECS: u64 = 60;
const DEFAULT_RESEND_COOLDOWN_SECS: u64 = 30;

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEnv {
    #[default]
    Development,
    Staging,
    Production,
}

impl DeployEnv {
    /// Lowercase tag as written in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            DeployEnv::Development => "development",
            DeployEnv::Staging => "staging",
            DeployEnv::Production => "production",
        }
    }

    /// The API URL override variable dedicated to this environment.
    pub fn api_url_var(self) -> &'static str {
        match self {
            DeployEnv::Development => "MERCHANT_API_URL_DEVELOPMENT",
            DeployEnv::Staging => "MERCHANT_API_URL_STAGING",
            DeployEnv::Production => "MERCHANT_API_URL_PRODUCTION",
        }
    }
}

impl fmt::Display for DeployEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeployEnv {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(DeployEnv::Development),
            "staging" => Ok(DeployEnv::Staging),
            "production" | "prod" => Ok(DeployEnv::Production),
            other => Err(CoreError::Config(format!(
                "Unknown deployment environment: {}",
                other
            ))),
        }
    }
}

/// Resolve the API base URL for `env` from the supplied variable lookup.
///
/// The environment's own variable wins, then the generic [`API_URL_VAR`].
/// Blank values are skipped and trailing slashes are trimmed. Returns `None`
/// when neither variable is set.
pub fn resolve_api_url<F>(env: DeployEnv, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(env.api_url_var())
        .and_then(non_empty)
        .or_else(|| lookup(API_URL_VAR).and_then(non_empty))
        .map(|url| url.trim_end_matches('/').to_string())
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Timings for the background token refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Seconds between scheduler wake-ups.
    pub poll_interval_secs: u64,
    /// Refresh once the access token expires within this many seconds.
    pub expiry_horizon_secs: u64,
    /// Timeout applied to each HTTP request.
    pub request_timeout_secs: u64,
    /// Derive the next wake-up from the token's own expiry.
    pub adaptive: bool,
    /// Lower bound on the adaptive delay.
    pub adaptive_min_delay_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            expiry_horizon_secs: DEFAULT_EXPIRY_HORIZON_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            adaptive: false,
            adaptive_min_delay_secs: DEFAULT_ADAPTIVE_MIN_DELAY_SECS,
        }
    }
}

impl RefreshSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn expiry_horizon(&self) -> Duration {
        Duration::from_secs(self.expiry_horizon_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn adaptive_min_delay(&self) -> Duration {
        Duration::from_secs(self.adaptive_min_delay_secs)
    }
}

/// OTP entry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSettings {
    /// Seconds before another code may be requested.
    pub resend_cooldown_secs: u64,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
        }
    }
}

impl OtpSettings {
    pub fn resend_cooldown(&self) -> Duration {
        Duration::from_secs(self.resend_cooldown_secs)
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Deployment environment tag.
    pub environment: DeployEnv,
    /// REST API base URL.
    pub api_url: String,
    /// Background refresh timings.
    pub refresh: RefreshSettings,
    /// OTP entry settings.
    pub otp: OtpSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            environment: DeployEnv::default(),
            api_url: DEFAULT_API_URL.to_string(),
            refresh: RefreshSettings::default(),
            otp: OtpSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file (if any), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from process environment variables.
    fn load_from_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// The deployment tag is applied first because it selects which URL
    /// variable is consulted.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(LOG_LEVEL_VAR).and_then(non_empty) {
            self.log_level = level;
        }

        if let Some(tag) = lookup(DEPLOY_ENV_VAR).and_then(non_empty) {
            match tag.parse::<DeployEnv>() {
                Ok(env) => self.environment = env,
                Err(err) => tracing::warn!(tag = %tag, error = %err, "Ignoring deployment tag"),
            }
        }

        if let Some(url) = resolve_api_url(self.environment, &lookup) {
            self.api_url = url;
        }
    }

    /// Check that the configuration is usable. Every timing must be non-zero.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;

        let timings = [
            ("refresh.poll_interval_secs", self.refresh.poll_interval_secs),
            ("refresh.expiry_horizon_secs", self.refresh.expiry_horizon_secs),
            ("refresh.request_timeout_secs", self.refresh.request_timeout_secs),
            ("refresh.adaptive_min_delay_secs", self.refresh.adaptive_min_delay_secs),
            ("otp.resend_cooldown_secs", self.otp.resend_cooldown_secs),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, secs)| *secs == 0) {
            return Err(CoreError::Config(format!(
                "{} must be greater than zero",
                name
            )));
        }

        Ok(())
    }

    /// Get the API URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// Join `path` onto the API base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

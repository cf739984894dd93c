//! Token refresh exchange.

use crate::http::{build_client, post_json};
use crate::{ExchangeError, RefreshError, RefreshResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use session_config::Config;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use token_vault::{TokenPair, TokenStore};
use tracing::{debug, error, info, warn};

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Body of a successful refresh.
///
/// `refresh_token` is only present when the server rotated it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}

/// Network side of a token refresh.
#[async_trait]
pub trait RefreshBackend: Send + Sync {
    /// Trade a refresh token for a new access token.
    async fn exchange(&self, refresh_token: &str) -> Result<RefreshResponse, ExchangeError>;
}

/// Refresh backend that talks to the auth service over HTTP.
#[derive(Clone)]
pub struct HttpRefreshBackend {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpRefreshBackend {
    /// Create a backend posting to `endpoint` with the given request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ExchangeError> {
        Ok(Self {
            http_client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ExchangeError> {
        Self::new(config.endpoint(REFRESH_PATH), config.refresh.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RefreshBackend for HttpRefreshBackend {
    async fn exchange(&self, refresh_token: &str) -> Result<RefreshResponse, ExchangeError> {
        let response = post_json(
            &self.http_client,
            &self.endpoint,
            &RefreshRequest { refresh_token },
            "refresh",
        )
        .await?;
        Ok(response.json().await?)
    }
}

/// Refreshes the stored session through a [`RefreshBackend`].
///
/// Any failed exchange ends the session: the store is cleared and the error
/// is returned for the caller to send the user back to login. Nothing is
/// retried here.
#[derive(Clone)]
pub struct RefreshClient {
    store: Arc<TokenStore>,
    backend: Arc<dyn RefreshBackend>,
}

impl RefreshClient {
    pub fn new(store: Arc<TokenStore>, backend: Arc<dyn RefreshBackend>) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Exchange the stored refresh token for a new pair and store it.
    pub async fn refresh(&self) -> RefreshResult<TokenPair> {
        let Some(refresh_token) = self.store.refresh_token()? else {
            info!("No refresh token stored, skipping refresh");
            return Err(RefreshError::NoRefreshToken);
        };

        debug!("Refreshing access token");

        let response = match self.backend.exchange(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Token refresh failed, clearing session");
                if let Err(clear_err) = self.store.clear() {
                    error!(error = %clear_err, "Failed to clear session after refresh failure");
                }
                return Err(RefreshError::RequestFailed(e));
            }
        };

        let rotated = response.refresh_token.is_some();
        self.store
            .apply_refresh(&response.access_token, response.refresh_token.as_deref())?;

        info!(rotated, "Token refreshed successfully");

        Ok(TokenPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or(refresh_token),
        })
    }
}

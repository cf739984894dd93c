//! Session facade for the UI layer.
//!
//! `SessionKeeper` ties the token store, the refresh client and the
//! background scheduler together. The UI starts it once a session exists,
//! listens for [`SessionEvent`]s and sends the user to login on
//! `LoginRequired`.

use crate::refresh_scheduler::{RefreshScheduler, SchedulerConfig, SessionEvent, TickOutcome};
use crate::token_inspector;
use crate::{
    ExchangeError, HttpRefreshBackend, OtpFlow, OtpResult, RefreshBackend, RefreshClient,
    RefreshResult, SessionExchange, DEFAULT_RESEND_COOLDOWN,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use session_config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use token_vault::{StorageResult, TokenPair, TokenStore};
use tracing::info;

/// Snapshot of the stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// An access token is stored.
    pub logged_in: bool,
    /// Expiry read from the access token, if readable.
    pub expires_at: Option<DateTime<Utc>>,
    /// The token is inside its refresh horizon (or unreadable).
    pub expiring_soon: bool,
}

/// Keeps one merchant session alive.
pub struct SessionKeeper {
    store: Arc<TokenStore>,
    scheduler: RefreshScheduler,
    scheduler_config: SchedulerConfig,
    resend_cooldown: Duration,
}

impl SessionKeeper {
    /// Create a session keeper over `store`, refreshing through `backend`.
    pub fn new(
        store: Arc<TokenStore>,
        backend: Arc<dyn RefreshBackend>,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let client = RefreshClient::new(store.clone(), backend);
        Self {
            store,
            scheduler: RefreshScheduler::new(client),
            scheduler_config,
            resend_cooldown: DEFAULT_RESEND_COOLDOWN,
        }
    }

    /// Create a session keeper that talks to the configured API over HTTP.
    pub fn from_config(config: &Config, store: Arc<TokenStore>) -> Result<Self, ExchangeError> {
        let backend = Arc::new(HttpRefreshBackend::from_config(config)?);
        let mut keeper = Self::new(
            store,
            backend,
            SchedulerConfig::from_settings(&config.refresh),
        );
        keeper.resend_cooldown = config.otp.resend_cooldown();
        Ok(keeper)
    }

    pub fn with_resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.resend_cooldown = cooldown;
        self
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    pub fn scheduler_config(&self) -> &SchedulerConfig {
        &self.scheduler_config
    }

    /// Start (or restart) background refresh.
    pub async fn start(&self) -> TickOutcome {
        self.scheduler.start(self.scheduler_config.clone()).await
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.scheduler.subscribe()
    }

    /// Refresh right away, regardless of the token's expiry.
    pub async fn refresh_now(&self) -> RefreshResult<TokenPair> {
        self.scheduler.refresh_now().await
    }

    /// End the session locally: stop refreshing and forget the tokens.
    pub fn logout(&self) -> StorageResult<()> {
        self.scheduler.stop();
        self.store.clear()?;
        self.scheduler.emit(SessionEvent::SessionEnded);
        info!("Logged out");
        Ok(())
    }

    pub fn status(&self) -> StorageResult<SessionStatus> {
        let Some(access_token) = self.store.access_token()? else {
            return Ok(SessionStatus {
                logged_in: false,
                expires_at: None,
                expiring_soon: false,
            });
        };

        Ok(SessionStatus {
            logged_in: true,
            expires_at: token_inspector::expires_at(&access_token),
            expiring_soon: token_inspector::is_expiring_soon(
                &access_token,
                self.scheduler_config.expiry_horizon,
            ),
        })
    }

    /// Begin a phone + one-time-code login. The first code is requested
    /// immediately.
    pub async fn begin_login(
        &self,
        phone_number: &str,
        exchange: Arc<dyn SessionExchange>,
    ) -> OtpResult<OtpFlow> {
        OtpFlow::start(phone_number, exchange, self.store.clone(), self.resend_cooldown).await
    }
}

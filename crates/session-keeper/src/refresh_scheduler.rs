//! Background access token refresh.
//!
//! A [`RefreshScheduler`] owns at most one polling task. Each tick reads the
//! access token, asks the token inspector whether it is close to expiry and
//! refreshes it if so. Ticks never overlap: the next wait starts only after
//! the previous tick, including its network call, has finished.

use crate::token_inspector::{self, DEFAULT_EXPIRY_HORIZON};
use crate::{RefreshClient, RefreshError, RefreshResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use session_config::RefreshSettings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use token_vault::{TokenPair, TokenStore};
use tracing::{debug, info, warn};

/// Default wait between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3 * 3600 + 30 * 60);

/// Lower bound on any wait between ticks.
pub const MIN_TICK_DELAY: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// How the wait before the next tick is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollStrategy {
    /// Always wait the full poll interval.
    #[default]
    Fixed,
    /// Wake when the token enters its expiry horizon if that comes before
    /// the poll interval, but never sooner than `min_delay`.
    Adaptive { min_delay: Duration },
}

/// Timing for the refresh scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub expiry_horizon: Duration,
    pub strategy: PollStrategy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            expiry_horizon: DEFAULT_EXPIRY_HORIZON,
            strategy: PollStrategy::Fixed,
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &RefreshSettings) -> Self {
        let strategy = if settings.adaptive {
            PollStrategy::Adaptive {
                min_delay: settings.adaptive_min_delay(),
            }
        } else {
            PollStrategy::Fixed
        };
        Self {
            poll_interval: settings.poll_interval(),
            expiry_horizon: settings.expiry_horizon(),
            strategy,
        }
    }

    /// Wait before the next tick given the current access token.
    ///
    /// Never shorter than [`MIN_TICK_DELAY`].
    pub fn next_delay(&self, access_token: Option<&str>, now: DateTime<Utc>) -> Duration {
        let delay = match self.strategy {
            PollStrategy::Fixed => self.poll_interval,
            PollStrategy::Adaptive { min_delay } => {
                let due = access_token
                    .and_then(|t| token_inspector::refresh_due_in(t, self.expiry_horizon, now))
                    .unwrap_or(self.poll_interval);
                due.min(self.poll_interval).max(min_delay)
            }
        };
        delay.max(MIN_TICK_DELAY)
    }
}

/// Session changes published by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new access token was stored.
    Refreshed { expires_at: Option<DateTime<Utc>> },
    /// The session is gone and the user has to log in again.
    LoginRequired { reason: String },
    /// No access token is stored; background refresh has stopped.
    SessionEnded,
}

/// Result of a single scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Token is outside its expiry horizon; nothing to do.
    Fresh,
    /// Token was refreshed.
    Refreshed,
    /// Refresh failed; the session was cleared and the user has to log in again.
    LoginRequired(String),
    /// Nothing to refresh with. The task stops without publishing an event
    /// and the stored access token is left alone.
    Stopped(String),
    /// No access token stored.
    NoSession,
    /// The tick could not finish for a local reason; retried next tick.
    Skipped(String),
}

impl TickOutcome {
    /// Returns true if there is no session left to keep alive.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            TickOutcome::LoginRequired(_) | TickOutcome::NoSession | TickOutcome::Stopped(_)
        )
    }
}

struct SchedulerShared {
    client: RefreshClient,
    events: broadcast::Sender<SessionEvent>,
    // Serializes ticks with each other and with on-demand refreshes.
    tick_lock: tokio::sync::Mutex<()>,
}

impl SchedulerShared {
    fn store(&self) -> &Arc<TokenStore> {
        self.client.store()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn tick(&self, horizon: Duration) -> TickOutcome {
        let _guard = self.tick_lock.lock().await;

        let access_token = match self.store().access_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No access token stored, stopping background refresh");
                self.emit(SessionEvent::SessionEnded);
                return TickOutcome::NoSession;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read access token, skipping tick");
                return TickOutcome::Skipped(e.to_string());
            }
        };

        if !token_inspector::is_expiring_soon(&access_token, horizon) {
            debug!("Access token outside expiry horizon");
            return TickOutcome::Fresh;
        }

        info!("Access token expiring soon, refreshing");
        match self.refresh_locked().await {
            Ok(_) => TickOutcome::Refreshed,
            Err(e @ RefreshError::NoRefreshToken) => TickOutcome::Stopped(e.to_string()),
            Err(e) if e.requires_login() => TickOutcome::LoginRequired(e.to_string()),
            Err(e) => TickOutcome::Skipped(e.to_string()),
        }
    }

    async fn refresh_now(&self) -> RefreshResult<TokenPair> {
        let _guard = self.tick_lock.lock().await;
        self.refresh_locked().await
    }

    // Caller holds tick_lock.
    async fn refresh_locked(&self) -> RefreshResult<TokenPair> {
        match self.client.refresh().await {
            Ok(pair) => {
                self.emit(SessionEvent::Refreshed {
                    expires_at: token_inspector::expires_at(&pair.access_token),
                });
                Ok(pair)
            }
            Err(e) => {
                if e.requires_login() {
                    self.emit(SessionEvent::LoginRequired {
                        reason: e.to_string(),
                    });
                } else if matches!(e, RefreshError::NoRefreshToken) {
                    info!("No refresh token stored, nothing to refresh");
                } else {
                    warn!(error = %e, "Token refresh could not complete");
                }
                Err(e)
            }
        }
    }
}

struct RefreshTask {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    fn cancel(self) {
        // The task may already have exited on its own.
        let _ = self.shutdown_tx.send(());
    }
}

/// Owner of the background refresh task.
///
/// Dropping the scheduler stops it.
pub struct RefreshScheduler {
    shared: Arc<SchedulerShared>,
    task: Mutex<Option<RefreshTask>>,
}

impl RefreshScheduler {
    pub fn new(client: RefreshClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(SchedulerShared {
                client,
                events,
                tick_lock: tokio::sync::Mutex::new(()),
            }),
            task: Mutex::new(None),
        }
    }

    /// Receive session events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.shared.emit(event);
    }

    /// Start background refresh, replacing any task already running.
    ///
    /// Runs one tick before returning. If that tick finds no session to keep
    /// alive, no background task is started.
    pub async fn start(&self, config: SchedulerConfig) -> TickOutcome {
        self.stop();

        let outcome = self.shared.tick(config.expiry_horizon).await;
        if outcome.ends_session() {
            info!(outcome = ?outcome, "Background refresh not started");
            return outcome;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shared = self.shared.clone();
        let poll_interval = config.poll_interval;
        let handle = tokio::spawn(run_refresh_loop(shared, config, shutdown_rx));

        let previous = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(RefreshTask {
                shutdown_tx,
                handle,
            });
        if let Some(previous) = previous {
            previous.cancel();
        }

        info!(poll_interval_secs = poll_interval.as_secs(), "Background refresh started");
        outcome
    }

    /// Stop background refresh. Does nothing if it is not running.
    ///
    /// A tick already in progress finishes, and its result is stored.
    pub fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            task.cancel();
            debug!("Background refresh stopped");
        }
    }

    /// Whether a background task is armed and alive.
    pub fn is_running(&self) -> bool {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        let alive = task.as_ref().is_some_and(|t| !t.handle.is_finished());
        if !alive {
            task.take();
        }
        alive
    }

    /// Refresh immediately, outside the polling schedule.
    pub async fn refresh_now(&self) -> RefreshResult<TokenPair> {
        self.shared.refresh_now().await
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_refresh_loop(
    shared: Arc<SchedulerShared>,
    config: SchedulerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        let access_token = shared.store().access_token().ok().flatten();
        let delay = config.next_delay(access_token.as_deref(), Utc::now());
        debug!(delay_secs = delay.as_secs(), "Next refresh check scheduled");

        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                debug!("Refresh loop received shutdown");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let outcome = shared.tick(config.expiry_horizon).await;
        if outcome.ends_session() {
            info!(outcome = ?outcome, "Background refresh exiting");
            return;
        }
    }
}

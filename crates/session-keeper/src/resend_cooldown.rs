//! Resend cooldown for one-time codes.

use std::time::Duration;
use tokio::time::Instant;

/// Wait between code requests.
pub const DEFAULT_RESEND_COOLDOWN: Duration = Duration::from_secs(30);

/// Countdown until another code may be requested.
///
/// Remaining time is derived from a monotonic start instant on every read,
/// so a suspended process resumes with the correct value.
#[derive(Debug, Clone)]
pub struct ResendCooldown {
    started: Instant,
    duration: Duration,
}

impl ResendCooldown {
    /// Start a cooldown of `duration` now.
    pub fn new(duration: Duration) -> Self {
        Self {
            started: Instant::now(),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.started.elapsed())
    }

    /// Remaining time in whole seconds, rounded up.
    pub fn remaining_secs(&self) -> u64 {
        let remaining = self.remaining();
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn is_ready(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Start counting down again from the full duration.
    pub fn restart(&mut self) {
        self.started = Instant::now();
    }
}

impl Default for ResendCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_RESEND_COOLDOWN)
    }
}

//! Foreground refresh loop.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use session_keeper::{SessionEvent, SessionKeeper, TickOutcome};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Refresh in the foreground until Ctrl-C or the session ends.
pub async fn watch(ctx: &Context) -> Result<()> {
    let keeper = ctx.keeper()?;
    run(&keeper, &ctx.format).await
}

/// How often the loop checks that background refresh is still armed.
const LIVENESS_CHECK: Duration = Duration::from_secs(30);

/// Start background refresh and report events until interrupted.
///
/// Returns an error when the session ends, so the process exits non-zero.
/// A quiet stop (nothing left to refresh with) ends the command cleanly.
pub(super) async fn run(keeper: &SessionKeeper, format: &OutputFormat) -> Result<()> {
    let mut events = keeper.subscribe();

    match keeper.start().await {
        TickOutcome::NoSession => {
            anyhow::bail!("Not logged in. Run 'merchant-session login --phone <number>'")
        }
        TickOutcome::LoginRequired(reason) => {
            anyhow::bail!("Login required: {}", reason)
        }
        TickOutcome::Stopped(reason) => {
            output::print_success(&format!("Not watching: {}", reason), format);
            return Ok(());
        }
        outcome => info!(?outcome, "Watching session"),
    }

    output::print_success("Watching session (Ctrl-C to stop)", format);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut liveness = tokio::time::interval(LIVENESS_CHECK);
    liveness.tick().await;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                keeper.stop();
                output::print_success("Stopped", format);
                return Ok(());
            }
            event = events.recv() => match event {
                Ok(event) => report(&event, format)?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed session events");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
            _ = liveness.tick() => {
                if !keeper.is_running() {
                    // Ending events are drained first so a forced logout still fails.
                    while let Ok(event) = events.try_recv() {
                        report(&event, format)?;
                    }
                    output::print_success("Background refresh stopped", format);
                    return Ok(());
                }
            }
        }
    }
}

/// Print one event; ending events become the command's error.
fn report(event: &SessionEvent, format: &OutputFormat) -> Result<()> {
    match event {
        SessionEvent::Refreshed { expires_at } => {
            let text = match expires_at {
                Some(at) => format!("Token refreshed (expires {})", at.to_rfc3339()),
                None => "Token refreshed".to_string(),
            };
            output::print_line(event, &text, format);
            Ok(())
        }
        SessionEvent::LoginRequired { reason } => {
            output::print_line(event, "Login required", format);
            anyhow::bail!("Login required: {}", reason)
        }
        SessionEvent::SessionEnded => {
            output::print_line(event, "Session ended", format);
            anyhow::bail!("Session ended")
        }
    }
}

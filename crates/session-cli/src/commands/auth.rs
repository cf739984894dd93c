//! Authentication commands.

use super::{watch, Context};
use crate::output;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use session_keeper::{HttpSessionExchange, OtpError, OtpFlow, OtpState, SessionStatus};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::warn;

/// Log in with a phone number and one-time code.
pub async fn login(ctx: &Context, phone: &str, then_watch: bool) -> Result<()> {
    let format = &ctx.format;
    let keeper = ctx.keeper()?;

    if keeper.status()?.logged_in {
        output::print_success(
            "Already logged in. Run 'merchant-session logout' to switch accounts",
            format,
        );
        if then_watch {
            return watch::run(&keeper, format).await;
        }
        return Ok(());
    }

    let exchange = Arc::new(HttpSessionExchange::from_config(&ctx.config)?);
    let mut flow = keeper.begin_login(phone, exchange).await?;
    eprintln!("Code sent to {}", flow.phone_number());

    while flow.state() != OtpState::Success {
        eprint!("Enter the 6-digit code ('r' to resend): ");
        io::stderr().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            anyhow::bail!("Login cancelled");
        }

        match line.trim() {
            "" => continue,
            "r" | "R" => resend(&mut flow).await?,
            code => submit(&mut flow, code).await?,
        }
    }

    if ctx.ephemeral {
        output::print_success("Logged in (tokens kept in memory only)", format);
    } else {
        output::print_success("Logged in", format);
    }

    if then_watch {
        return watch::run(&keeper, format).await;
    }
    Ok(())
}

/// Fill the code and submit it. Only unrecoverable errors are returned.
async fn submit(flow: &mut OtpFlow, code: &str) -> Result<()> {
    if let Err(e) = flow.fill(code) {
        eprintln!("{}", e);
        return Ok(());
    }

    match flow.submit().await {
        Ok(_) => Ok(()),
        Err(e @ (OtpError::Validation(_) | OtpError::Auth(_))) => {
            eprintln!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn resend(flow: &mut OtpFlow) -> Result<()> {
    match flow.resend().await {
        Ok(()) => eprintln!("New code sent"),
        Err(e @ (OtpError::ResendCooldown { .. } | OtpError::Resend(_))) => {
            warn!(error = %e, "Resend refused");
            eprintln!("{}", e);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Logout and clear stored tokens.
pub fn logout(ctx: &Context) -> Result<()> {
    let keeper = ctx.keeper()?;

    if !keeper.status()?.logged_in {
        output::print_success("Not logged in", &ctx.format);
        return Ok(());
    }

    keeper.logout()?;
    output::print_success("Logged out", &ctx.format);
    Ok(())
}

/// Session status as printed by `status`.
#[derive(Debug, Serialize)]
struct StatusReport {
    logged_in: bool,
    expires_at: Option<DateTime<Utc>>,
    expiring_soon: bool,
    environment: &'static str,
    api_url: String,
}

impl StatusReport {
    fn new(status: SessionStatus, ctx: &Context) -> Self {
        Self {
            logged_in: status.logged_in,
            expires_at: status.expires_at,
            expiring_soon: status.expiring_soon,
            environment: ctx.config.environment.as_str(),
            api_url: ctx.config.api_url.clone(),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = if self.logged_in { "logged in" } else { "not logged in" };
        writeln!(f, "{}", output::row("Auth", auth))?;
        if self.logged_in {
            let expires = self
                .expires_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            writeln!(f, "{}", output::row("Expires", &expires))?;
            let due = if self.expiring_soon { "yes" } else { "no" };
            writeln!(f, "{}", output::row("Refresh due", due))?;
        }
        writeln!(f, "{}", output::row("Environment", self.environment))?;
        write!(f, "{}", output::row("API", &self.api_url))
    }
}

/// Show session status.
pub fn status(ctx: &Context) -> Result<()> {
    let keeper = ctx.keeper()?;
    let report = StatusReport::new(keeper.status()?, ctx);
    output::print(&report, &ctx.format);
    Ok(())
}

/// Refresh the access token now.
pub async fn refresh(ctx: &Context) -> Result<()> {
    let keeper = ctx.keeper()?;

    match keeper.refresh_now().await {
        Ok(pair) => {
            let expires = session_keeper::token_inspector::expires_at(&pair.access_token)
                .map(|at| format!(" (expires {})", at.to_rfc3339()))
                .unwrap_or_default();
            output::print_success(&format!("Token refreshed{}", expires), &ctx.format);
            Ok(())
        }
        Err(e) if e.requires_login() => {
            anyhow::bail!("{}. Log in again with 'merchant-session login --phone <number>'", e)
        }
        Err(e) => Err(e.into()),
    }
}

//! Merchant session CLI - log in by phone and keep the session fresh.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use session_config::{init_logging, Config, Paths};
use tracing::debug;

/// Merchant session CLI - phone login and token refresh.
#[derive(Parser)]
#[command(name = "merchant-session")]
#[command(about = "Log in to the merchant dashboard API and keep the session alive")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Keep tokens in memory only; nothing is written to disk
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a phone number and one-time code
    Login {
        /// Phone number the code is sent to
        #[arg(long)]
        phone: String,

        /// Keep refreshing in the foreground after logging in
        #[arg(long)]
        watch: bool,
    },

    /// Logout and clear stored tokens
    Logout,

    /// Show session status
    Status,

    /// Refresh the access token now
    Refresh,

    /// Refresh in the foreground until interrupted or the session ends
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let context = match build_context(&cli) {
        Ok(context) => context,
        Err(e) => {
            output::print_error(&e.to_string(), &cli.format);
            std::process::exit(1);
        }
    };

    debug!(
        environment = context.config.environment.as_str(),
        ephemeral = context.ephemeral,
        "CLI started"
    );

    let result = match cli.command {
        Commands::Login { phone, watch } => commands::login(&context, &phone, watch).await,
        Commands::Logout => commands::logout(&context),
        Commands::Status => commands::status(&context),
        Commands::Refresh => commands::refresh(&context).await,
        Commands::Watch => commands::watch(&context).await,
    };

    if let Err(e) = result {
        output::print_error(&e.to_string(), &cli.format);
        std::process::exit(1);
    }
}

/// Resolve paths and config, then start logging.
fn build_context(cli: &Cli) -> anyhow::Result<commands::Context> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    if cli.ephemeral {
        init_logging(level, None);
    } else {
        paths.ensure_dirs()?;
        init_logging(level, Some(&paths));
    }

    Ok(commands::Context {
        config,
        paths,
        format: cli.format,
        ephemeral: cli.ephemeral,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_phone() {
        assert!(Cli::try_parse_from(["merchant-session", "login"]).is_err());

        let cli = Cli::try_parse_from(["merchant-session", "login", "--phone", "+15550100"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Login { ref phone, watch: false } if phone == "+15550100"
        ));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "merchant-session",
            "status",
            "--format",
            "json",
            "--ephemeral",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.format, output::OutputFormat::Json);
        assert!(cli.ephemeral);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}

//! Tally Console - terminal client
//!
//! # Usage
//!
//! ```bash
//! # Print the timer stream until it exits
//! tally-console stream
//!
//! # Stop after three lines
//! tally-console stream --stop-after 3
//!
//! # Manage users
//! tally-console users list
//! tally-console users add "Ada Lovelace" ada@example.com
//! tally-console users update 1 "Ada L." ada@lovelace.org
//! tally-console users remove 1
//! ```

mod users;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tally_core::config::{default_config_path, load_config_from_path, ConfigOverrides};

/// Tally Console - timer stream viewer and user management
#[derive(Parser, Debug)]
#[command(name = "tally-console")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, env = "TALLY_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "TALLY_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print timer stream lines as they arrive
    Stream {
        /// Stream URL (defaults to the configured one)
        #[arg(long, value_name = "URL")]
        url: Option<String>,

        /// Stop after this many lines
        #[arg(long, value_name = "N")]
        stop_after: Option<usize>,
    },

    /// Manage users
    Users {
        /// Server base URL
        #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:5173")]
        base_url: String,

        #[command(subcommand)]
        action: users::UsersCommand,
    },
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they never mix with stream output.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("tally_console={level},tally_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Stream { url, stop_after } => {
            let config_path = cli.config.or_else(default_config_path);
            let mut config =
                load_config_from_path(config_path).context("Failed to load configuration")?;
            ConfigOverrides {
                stream_url: url,
                ..Default::default()
            }
            .apply(&mut config);
            debug!(url = %config.stream_url, source = %config.source(), "Stream URL resolved");

            watch::run(&config.stream_url, stop_after).await
        }
        Command::Users { base_url, action } => {
            let client = users::UsersClient::new(base_url);
            users::run(&client, action).await
        }
    }
}

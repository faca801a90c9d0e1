//! Tally Daemon - HTTP server entry point
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (127.0.0.1:5173)
//! tally-daemon
//!
//! # Custom address and a faster, shorter stream
//! tally-daemon --bind 0.0.0.0:8080 --tick-limit 5 --tick-period-ms 200
//!
//! # With config file
//! tally-daemon --config ./tally.toml
//!
//! # Verbose logging
//! RUST_LOG=debug tally-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use tally_core::config::{default_config_path, load_config_from_path, ConfigOverrides};
use tally_daemon::DaemonServer;

/// Tally Daemon - timer event stream and user API
#[derive(Parser, Debug)]
#[command(name = "tally-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(short = 'b', long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "TALLY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Ticks per stream before the exit event
    #[arg(long, value_name = "N")]
    tick_limit: Option<u32>,

    /// Milliseconds between ticks
    #[arg(long, value_name = "MS")]
    tick_period_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "TALLY_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "tally_daemon={level},tally_core={level},tower_http={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Resolve when SIGINT or SIGTERM arrives
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
        info!("Received SIGINT, initiating shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating shutdown");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Tally Daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load configuration")?;

    ConfigOverrides {
        bind: args.bind,
        tick_limit: args.tick_limit,
        tick_period_ms: args.tick_period_ms,
        stream_url: None,
    }
    .apply(&mut config);
    config.validate().context("Invalid command-line options")?;

    info!(
        source = %config.source(),
        file = ?config.config_file_path,
        "Configuration loaded"
    );

    let server = DaemonServer::new(config);
    match server.run(shutdown_signal()).await {
        Ok(()) => {
            info!("Tally daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Daemon stopped with error");
            Err(e)
        }
    }
}

//! webtime Daemon - Websocket clock server
//!
//! This binary runs the clock ticker and serves it to browsers over
//! websockets.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port (8888)
//! webtimed
//!
//! # Custom port and a faster tick
//! webtimed --port 9000 --interval-ms 250
//!
//! # Load settings from a TOML file
//! WEBTIME_CONFIG=/etc/webtime.toml webtimed
//!
//! # Enable debug logging
//! RUST_LOG=webtimed=debug webtimed
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use webtimed::config::{DaemonConfig, CONFIG_ENV};
use webtimed::registrar::SubscriptionRegistrar;
use webtimed::server::TimeServer;
use webtimed::ticker::spawn_ticker;

/// webtime daemon - pushes the current time to every connected browser
#[derive(Parser, Debug)]
#[command(name = "webtimed", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port number
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to
    #[arg(long)]
    bind: Option<String>,

    /// Milliseconds between clock ticks
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl Args {
    /// Loads the config file and environment, then applies flags on top.
    fn into_config(self) -> Result<DaemonConfig> {
        let path = self.config.or_else(|| env::var(CONFIG_ENV).ok().map(PathBuf::from));
        let mut config = DaemonConfig::load(path.as_deref()).context("Failed to load configuration")?;

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(ms) = self.interval_ms {
            config.tick_interval_ms = ms;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    run_daemon(config)
}

/// Runs the daemon (async entry point).
#[tokio::main]
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("webtimed=info".parse()?)
                .add_directive("webtime_core=info".parse()?)
                .add_directive("webtime_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "webtime daemon starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Setup signal handlers
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    // Spawn the ticker
    let clock = config.wall_clock()?;
    let (shared, ticker_task) =
        spawn_ticker(config.tick_interval(), clock, cancel_token.child_token());

    let registrar =
        SubscriptionRegistrar::new(shared).with_shutdown_token(cancel_token.child_token());

    // Create and run the server
    let addr = config.socket_addr()?;
    let server = TimeServer::bind(addr, registrar.clone(), cancel_token.clone())
        .await
        .context("Failed to start server")?;

    info!(
        "Running webserver on http://{}:{}/time/",
        config.host,
        server.local_addr().port()
    );

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        cancel_token.cancel();
        return Err(e.into());
    }

    // Server only returns once the token fired; wait for the ticker to wind down
    registrar.shutdown();
    let _ = ticker_task.await;

    info!("webtime daemon stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

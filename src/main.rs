//! Sumi-Relay main entry point
//!
//! This is the command-line interface for the Sumi-Relay URL harvester.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use sumi_relay::config::{load_config, validate, Config};
use sumi_relay::http::{AppState, HttpServer};
use sumi_relay::Relay;
use tracing_subscriber::EnvFilter;

/// Sumi-Relay: a URL harvester with live status streaming
///
/// Sumi-Relay fetches submitted pages, extracts their title, first heading
/// and first image once their scheduled time arrives, saves the image, and
/// streams every state change to connected observers.
#[derive(Parser, Debug)]
#[command(name = "sumi-relay")]
#[command(version = "1.0.0")]
#[command(about = "A URL harvester with live status streaming", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Directory for saved images, overriding the configuration
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    let relay = Relay::start(&config).context("Failed to start relay")?;
    let server = HttpServer::new(
        config.server.listen_addr.clone(),
        AppState {
            pipeline: relay.pipeline().clone(),
            broadcaster: relay.broadcaster().clone(),
        },
    );

    let server_shutdown = relay.shutdown_signal();
    let mut server_task = tokio::spawn(async move { server.run(server_shutdown).await });

    let early_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Received Ctrl-C");
            None
        }
        result = &mut server_task => Some(result),
    };

    relay.shutdown().await;

    let result = match early_exit {
        Some(result) => result,
        None => server_task.await,
    };
    result.context("HTTP server task panicked")??;

    Ok(())
}

/// Loads the configuration file, if any, and applies command-line overrides
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }
    if let Some(image_dir) = &cli.image_dir {
        config.storage.image_dir = image_dir.clone();
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_relay=info,tower_http=info,warn"),
            1 => EnvFilter::new("sumi_relay=debug,tower_http=debug,info"),
            2 => EnvFilter::new("sumi_relay=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

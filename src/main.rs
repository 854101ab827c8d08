//! Sockweave - SOCKS4 tunneling over a multiplexed link
//!
//! This is the main entry point for the Sockweave application.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sockweave::client::run_client;
use sockweave::config::load_config;
use sockweave::server::run_server;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Sockweave - SOCKS4 local proxy multiplexed over a single relay link
#[derive(Parser, Debug)]
#[command(name = "sockweave")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Role to run
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay endpoint and block
    Serve,
    /// Run the local proxy endpoint and block
    Connect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, args.json_log)?;

    let config = load_config(&args.config)?;

    info!("Sockweave v{}", sockweave::VERSION);
    info!("Configuration loaded from: {:?}", args.config);

    // Setup shutdown signal
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    // Handle Ctrl+C and termination signals (cross-platform)
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            // On Windows, only handle Ctrl+C
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down...");
        }

        let _ = shutdown_tx_clone.send(true);
    });

    match args.command {
        Command::Serve => {
            let server_config = config.server()?.clone();
            info!("Relay binding: {}", server_config.bind_addr);
            run_server(server_config, shutdown_rx).await
        }
        Command::Connect => {
            let client_config = config.client()?.clone();
            info!("SOCKS4 listener: {}", client_config.listen_addr);
            info!("Relay address: {}", client_config.remote_addr);
            run_client(client_config, shutdown_rx).await
        }
    }
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}

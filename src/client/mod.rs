//! Local proxy endpoint (client role)
//!
//! Accepts SOCKS4 connections from local applications and tunnels each
//! one as a multiplexed stream over the link to the relay.

mod endpoint;

pub use endpoint::Client;

use crate::config::ClientConfig;
use anyhow::Result;
use tokio::sync::broadcast;

/// Bind the SOCKS4 listener and run the client until shutdown
pub async fn run_client(
    config: ClientConfig,
    shutdown_rx: broadcast::Receiver<bool>,
) -> Result<()> {
    let client = Client::bind(config).await?;
    client.run(shutdown_rx).await
}

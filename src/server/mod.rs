//! Relay endpoint (server role)
//!
//! Accepts link connections from local proxy endpoints. Each accepted
//! link is an independent session: the relay dials the destination
//! named by every OPEN frame, then pumps bytes between the outbound
//! socket and the link with the same reassembly discipline the client
//! uses.

mod session;

pub use session::run_session;

use crate::config::ServerConfig;
use crate::error::SockweaveError;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Relay endpoint
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
}

impl Server {
    /// Validate the configuration and bind the link listener
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(SockweaveError::Config)
            .context("Invalid server configuration")?;

        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind link listener on {}", config.bind_addr))?;

        info!("Relay listening on {}", config.bind_addr);
        Ok(Server { config, listener })
    }

    /// Address the link listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept link connections until shutdown
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((link, peer)) => {
                            info!("Link connection from {}", peer);
                            let config = self.config.clone();
                            let session_shutdown = shutdown_rx.resubscribe();
                            tokio::spawn(async move {
                                if let Err(e) = run_session(link, config, session_shutdown).await {
                                    warn!("Session from {} ended with error: {:#}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping relay");
                    return Ok(());
                }
            }
        }
    }
}

/// Bind the relay and run it until shutdown
pub async fn run_server(
    config: ServerConfig,
    shutdown_rx: broadcast::Receiver<bool>,
) -> Result<()> {
    let server = Server::bind(config).await?;
    server.run(shutdown_rx).await
}

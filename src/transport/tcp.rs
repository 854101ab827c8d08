//! TCP transport implementation
//!
//! Plain TCP is the default (and currently only) way to establish the
//! link to the relay.

use super::{RelayAddr, SocketOpts, Transport};
use crate::config::TransportConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP transport for plain connections
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a TCP transport with default options
    pub fn with_defaults() -> Self {
        TcpTransport {
            socket_opts: SocketOpts::for_link(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Override the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    fn new(config: &TransportConfig) -> Result<Self> {
        Ok(TcpTransport {
            socket_opts: SocketOpts::from_config(config),
            connect_timeout: Duration::from_secs(config.connect_timeout),
        })
    }

    async fn connect(&self, addr: &RelayAddr) -> Result<Self::Stream> {
        let resolved = addr.resolve().await?;

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(resolved))
            .await
            .with_context(|| format!("Connection timeout to {}", addr.addr()))?
            .with_context(|| format!("Failed to connect to {}", addr.addr()))?;

        self.socket_opts.apply(&stream)?;

        tracing::debug!("link established to {}", resolved);

        Ok(stream)
    }
}

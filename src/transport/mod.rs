//! Transport layer for the shared link
//!
//! The link between the local proxy endpoint and the relay is a single
//! ordered, reliable byte stream. This module provides the seam that
//! establishes it: a [`Transport`] trait and the plain TCP
//! implementation, plus the socket options applied to link and stream
//! sockets.

mod addr;
mod tcp;

pub use addr::RelayAddr;
pub use tcp::TcpTransport;

use crate::config::TransportConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Socket options for configuring connections
#[derive(Debug, Clone)]
pub struct SocketOpts {
    /// Enable TCP_NODELAY
    pub nodelay: bool,
    /// TCP keepalive timeout
    pub keepalive_secs: Option<u64>,
    /// TCP keepalive interval
    pub keepalive_interval: Option<u64>,
}

impl Default for SocketOpts {
    fn default() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(20),
            keepalive_interval: Some(8),
        }
    }
}

impl SocketOpts {
    /// Options for the long-lived link (longer keepalive)
    pub fn for_link() -> Self {
        SocketOpts {
            nodelay: true,
            keepalive_secs: Some(30),
            keepalive_interval: Some(10),
        }
    }

    /// Options for per-stream sockets (latency over batching)
    pub fn for_stream() -> Self {
        SocketOpts::default()
    }

    /// Build socket options from the transport configuration
    pub fn from_config(config: &TransportConfig) -> Self {
        SocketOpts {
            nodelay: config.tcp.nodelay,
            keepalive_secs: Some(config.tcp.keepalive_secs),
            keepalive_interval: Some(config.tcp.keepalive_interval),
        }
    }

    /// Apply these options to a TCP stream
    pub fn apply(&self, stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let (Some(timeout), Some(interval)) = (self.keepalive_secs, self.keepalive_interval) {
            let socket = socket2::SockRef::from(stream);
            let keepalive = socket2::TcpKeepalive::new()
                .with_time(Duration::from_secs(timeout))
                .with_interval(Duration::from_secs(interval));
            socket.set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

/// Transport trait for establishing the link
///
/// Implementations connect to the relay and return a stream usable as
/// the session link. The multiplex protocol is the payload carried once
/// the connection exists; the transport itself knows nothing about it.
#[async_trait]
pub trait Transport: Debug + Send + Sync + 'static {
    /// The stream type produced by this transport
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Create a transport instance from configuration
    fn new(config: &TransportConfig) -> Result<Self>
    where
        Self: Sized;

    /// Connect to the relay
    async fn connect(&self, addr: &RelayAddr) -> Result<Self::Stream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_opts_default() {
        let opts = SocketOpts::default();
        assert!(opts.nodelay);
        assert_eq!(opts.keepalive_secs, Some(20));
        assert_eq!(opts.keepalive_interval, Some(8));
    }

    #[test]
    fn test_socket_opts_for_link() {
        let opts = SocketOpts::for_link();
        assert!(opts.nodelay);
        assert_eq!(opts.keepalive_secs, Some(30));
    }

    #[test]
    fn test_socket_opts_from_config() {
        let config = TransportConfig::default();
        let opts = SocketOpts::from_config(&config);
        assert!(opts.nodelay);
    }
}

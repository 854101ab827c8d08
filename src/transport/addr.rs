//! Relay address resolution
//!
//! Name resolution is treated as a black box: resolve once, dial, and
//! cache the result so reconnect attempts skip the lookup. The cache is
//! invalidated when a cached address stops working.

use anyhow::{Context, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Relay address with a cached resolution
#[derive(Debug, Clone)]
pub struct RelayAddr {
    addr: String,
    cached: Arc<RwLock<Option<SocketAddr>>>,
}

impl RelayAddr {
    /// Create an address that has not been resolved yet
    pub fn new(addr: &str) -> Self {
        RelayAddr {
            addr: addr.to_string(),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// The original address string
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Resolve the address, reusing the cached result when present
    pub async fn resolve(&self) -> Result<SocketAddr> {
        if let Some(cached) = *self.cached.read().await {
            return Ok(cached);
        }

        // ToSocketAddrs blocks, so resolution runs off the runtime threads
        let addr = self.addr.clone();
        let resolved = tokio::task::spawn_blocking(move || {
            addr.to_socket_addrs()
                .with_context(|| format!("Failed to resolve address: {}", addr))?
                .next()
                .with_context(|| format!("No addresses found for: {}", addr))
        })
        .await
        .context("DNS resolution task panicked")??;

        *self.cached.write().await = Some(resolved);
        Ok(resolved)
    }

    /// Drop the cached resolution so the next resolve looks up afresh
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

impl From<SocketAddr> for RelayAddr {
    fn from(addr: SocketAddr) -> Self {
        RelayAddr {
            addr: addr.to_string(),
            cached: Arc::new(RwLock::new(Some(addr))),
        }
    }
}

impl From<&str> for RelayAddr {
    fn from(addr: &str) -> Self {
        RelayAddr::new(addr)
    }
}

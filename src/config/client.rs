//! Client (local proxy endpoint) configuration

use super::TransportConfig;
use serde::{Deserialize, Serialize};

/// Default SOCKS4 handshake / open-ack timeout in seconds
fn default_handshake_timeout() -> u64 {
    10
}

/// Default number of link reconnect attempts before giving up
fn default_max_reconnects() -> u32 {
    10
}

/// Local proxy endpoint configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// Address the SOCKS4 listener binds (e.g. "127.0.0.1:1080")
    pub listen_addr: String,

    /// Relay address the link connects to (e.g. "relay.example.com:7000")
    pub remote_addr: String,

    /// Bound on the SOCKS4 handshake read and the OPEN_ACK wait, seconds
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,

    /// Link reconnect attempts before the client exits
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,

    /// Transport configuration for the link
    #[serde(default)]
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.remote_addr.is_empty() {
            return Err("remote_addr must not be empty".to_string());
        }
        if self.handshake_timeout == 0 {
            return Err("handshake_timeout must be at least 1 second".to_string());
        }
        Ok(())
    }
}

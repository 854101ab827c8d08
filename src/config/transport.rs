//! Transport configuration types

use serde::{Deserialize, Serialize};

/// Default link connect timeout in seconds
fn default_connect_timeout() -> u64 {
    10
}

/// Default TCP_NODELAY setting
fn default_nodelay() -> bool {
    true
}

/// Default keepalive timeout in seconds
fn default_keepalive_secs() -> u64 {
    20
}

/// Default keepalive interval in seconds
fn default_keepalive_interval() -> u64 {
    8
}

/// Transport configuration for the link
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransportConfig {
    /// Link connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// TCP socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            connect_timeout: default_connect_timeout(),
            tcp: TcpConfig::default(),
        }
    }
}

/// TCP socket options
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TcpConfig {
    /// Enable TCP_NODELAY
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,

    /// Keepalive timeout in seconds
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,

    /// Keepalive interval in seconds
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        TcpConfig {
            nodelay: default_nodelay(),
            keepalive_secs: default_keepalive_secs(),
            keepalive_interval: default_keepalive_interval(),
        }
    }
}

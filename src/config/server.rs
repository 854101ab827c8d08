//! Server (relay endpoint) configuration

use serde::{Deserialize, Serialize};

/// Default outbound dial timeout in seconds
fn default_dial_timeout() -> u64 {
    10
}

/// Relay endpoint configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Address the relay binds for inbound link connections
    pub bind_addr: String,

    /// Bound on outbound dials to stream destinations, seconds
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout: u64,
}

impl ServerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bind_addr.is_empty() {
            return Err("bind_addr must not be empty".to_string());
        }
        if self.dial_timeout == 0 {
            return Err("dial_timeout must be at least 1 second".to_string());
        }
        Ok(())
    }
}

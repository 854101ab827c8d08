//! Configuration module for Sockweave
//!
//! Provides configuration types and TOML parsing for both roles. A
//! single file may carry a `[client]` section, a `[server]` section, or
//! both; each subcommand requires only its own section.

mod client;
mod server;
mod transport;

pub use client::ClientConfig;
pub use server::ServerConfig;
pub use transport::{TcpConfig, TransportConfig};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Local proxy endpoint configuration
    pub client: Option<ClientConfig>,
    /// Relay endpoint configuration
    pub server: Option<ServerConfig>,
}

impl Config {
    /// The client section, or an error naming what is missing
    pub fn client(&self) -> Result<&ClientConfig> {
        match &self.client {
            Some(c) => Ok(c),
            None => bail!("Configuration has no [client] section"),
        }
    }

    /// The server section, or an error naming what is missing
    pub fn server(&self) -> Result<&ServerConfig> {
        match &self.server {
            Some(s) => Ok(s),
            None => bail!("Configuration has no [server] section"),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse configuration")
}

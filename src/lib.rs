//! # Sockweave - SOCKS4 tunneling over a multiplexed link
//!
//! Sockweave pairs a SOCKS4-speaking local proxy with a remote relay.
//! Applications configured to use the local proxy get their TCP
//! connections tunneled, as independent multiplexed sub-streams, over a
//! single persistent link to the relay, which performs the actual
//! outbound connection and forwards bytes back.
//!
//! ## Architecture
//!
//! ```text
//! Application -> Local Proxy (SOCKS4) -> [one link, many streams] -> Relay -> Target
//! ```
//!
//! Each application connection becomes one stream. Data chunks are
//! tagged with a stream id and a byte offset; the receiving side
//! reassembles them in ascending, gapless order even when frames
//! interleave arbitrarily on the link.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sockweave::config::load_config;
//! use sockweave::client::run_client;
//! use tokio::sync::broadcast;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config("config.toml")?;
//!     let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
//!
//!     run_client(config.client()?.clone(), shutdown_rx).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod error;
pub mod mux;
pub mod protocol;
pub mod server;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use client::run_client;
pub use config::{load_config, Config};
pub use error::{Socks4Error, SockweaveError};
pub use server::run_server;

/// Version of the Sockweave library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");

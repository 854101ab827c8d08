//! SOCKS4 protocol support
//!
//! Implements the SOCKS4 request/reply wire format spoken between local
//! applications and the proxy endpoint. Only the CONNECT command is
//! supported; BIND requests are answered with a FAILED reply.

mod codec;
mod types;

pub use codec::{decode_request, encode_reply, read_request, write_reply};
pub use types::{Socks4Command, Socks4Reply, Socks4ReplyCode, Socks4Request, SOCKS4_VERSION};

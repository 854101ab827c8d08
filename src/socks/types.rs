//! SOCKS4 message types
//!
//! A request is at least 8 bytes: version, command, destination port
//! (big-endian), destination IPv4 address, followed by a variable-length
//! identification string terminated by a zero byte. A reply is exactly
//! 8 bytes with the version field fixed to zero.

use crate::error::Socks4Error;
use std::net::Ipv4Addr;

/// Protocol version expected in every request
pub const SOCKS4_VERSION: u8 = 4;

/// SOCKS4 request commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks4Command {
    /// Establish a TCP connection to the destination
    Connect = 1,
    /// Listen for an inbound connection (not supported)
    Bind = 2,
}

impl TryFrom<u8> for Socks4Command {
    type Error = Socks4Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Socks4Command::Connect),
            2 => Ok(Socks4Command::Bind),
            other => Err(Socks4Error::CommandNotSupported(other)),
        }
    }
}

/// SOCKS4 reply result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Socks4ReplyCode {
    /// Request granted
    Granted = 0x5A,
    /// Request rejected or failed
    Failed = 0x5B,
}

impl From<Socks4ReplyCode> for u8 {
    fn from(code: Socks4ReplyCode) -> Self {
        code as u8
    }
}

/// A parsed SOCKS4 request
///
/// Parsed once per new application connection and immutable thereafter.
/// The identification string is retained for protocol conformance but is
/// not used for authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Request {
    /// Requested command
    pub command: Socks4Command,
    /// Destination port
    pub dstport: u16,
    /// Destination IPv4 address
    pub dstip: Ipv4Addr,
    /// Identification string, without the terminating zero byte
    pub ident: Vec<u8>,
}

/// A SOCKS4 reply
///
/// Exactly one reply is sent per handshake, before any data relaying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Reply {
    /// Result code
    pub code: Socks4ReplyCode,
    /// Echoed destination port (carries the stream id on GRANTED)
    pub dstport: u16,
    /// Echoed destination address
    pub dstip: Ipv4Addr,
}

impl Socks4Reply {
    /// Build a GRANTED reply echoing the destination and stream id
    ///
    /// Ids beyond `u16::MAX` wrap in the 16-bit port field; the value is
    /// informational, the reply code is what applications act on.
    pub fn granted(stream_id: u32, dstip: Ipv4Addr) -> Self {
        Socks4Reply {
            code: Socks4ReplyCode::Granted,
            dstport: (stream_id & 0xFFFF) as u16,
            dstip,
        }
    }

    /// Build a FAILED reply
    pub fn failed() -> Self {
        Socks4Reply {
            code: Socks4ReplyCode::Failed,
            dstport: 0,
            dstip: Ipv4Addr::UNSPECIFIED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_try_from() {
        assert_eq!(Socks4Command::try_from(1).unwrap(), Socks4Command::Connect);
        assert_eq!(Socks4Command::try_from(2).unwrap(), Socks4Command::Bind);
        assert!(matches!(
            Socks4Command::try_from(3),
            Err(Socks4Error::CommandNotSupported(3))
        ));
        assert!(Socks4Command::try_from(0).is_err());
    }

    #[test]
    fn test_reply_code_values() {
        assert_eq!(u8::from(Socks4ReplyCode::Granted), 0x5A);
        assert_eq!(u8::from(Socks4ReplyCode::Failed), 0x5B);
    }

    #[test]
    fn test_granted_reply_carries_stream_id() {
        let reply = Socks4Reply::granted(17, Ipv4Addr::new(93, 184, 216, 34));
        assert_eq!(reply.code, Socks4ReplyCode::Granted);
        assert_eq!(reply.dstport, 17);
        assert_eq!(reply.dstip, Ipv4Addr::new(93, 184, 216, 34));
    }

    #[test]
    fn test_granted_reply_wraps_wide_stream_id() {
        let reply = Socks4Reply::granted(0x0001_0007, Ipv4Addr::LOCALHOST);
        assert_eq!(reply.dstport, 7);
    }

    #[test]
    fn test_failed_reply() {
        let reply = Socks4Reply::failed();
        assert_eq!(reply.code, Socks4ReplyCode::Failed);
        assert_eq!(reply.dstport, 0);
        assert_eq!(reply.dstip, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_ipv4_round_trips() {
        let addr = Ipv4Addr::new(93, 184, 216, 34);

        // octets
        assert_eq!(Ipv4Addr::from(addr.octets()), addr);

        // u32
        assert_eq!(Ipv4Addr::from(u32::from(addr)), addr);

        // dotted-decimal string
        assert_eq!("93.184.216.34".parse::<Ipv4Addr>().unwrap(), addr);
        assert_eq!(addr.to_string(), "93.184.216.34");
    }
}

//! Error types for Sockweave
//!
//! This module defines all custom error types used throughout the application.

use std::io;
use thiserror::Error;

/// Main error type for Sockweave operations
#[derive(Error, Debug)]
pub enum SockweaveError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed multiplex frame (bad version, unknown type, bad length)
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// SOCKS4 handshake failure
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Relay-side outbound connect failure
    #[error("Dial failed: {0}")]
    DialFailed(String),

    /// Frame received for a stream id with no table entry
    #[error("Unknown stream: {0}")]
    UnknownStream(u32),

    /// Transport-level failure on the shared link; fatal for the session
    #[error("Link broken: {0}")]
    LinkBroken(String),

    /// SOCKS4 protocol error
    #[error("SOCKS4 error: {0}")]
    Socks4(#[from] Socks4Error),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// SOCKS4 specific errors
#[derive(Error, Debug)]
pub enum Socks4Error {
    /// Unsupported SOCKS version
    #[error("Unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// Command not supported (only CONNECT is accepted)
    #[error("Command not supported: {0}")]
    CommandNotSupported(u8),

    /// Request shorter than the fixed 8-byte prefix
    #[error("Truncated request")]
    TruncatedRequest,

    /// Identification string exceeds the allowed length
    #[error("Identification string too long ({0} bytes)")]
    IdentTooLong(usize),

    /// Identification string is missing its null terminator
    #[error("Unterminated identification string")]
    UnterminatedIdent,
}

impl SockweaveError {
    /// Whether this error tears down the whole session rather than one stream
    pub fn is_fatal(&self) -> bool {
        matches!(self, SockweaveError::LinkBroken(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SockweaveError::Config("invalid config".to_string());
        assert_eq!(format!("{}", err), "Configuration error: invalid config");

        let err = SockweaveError::MalformedFrame("bad version".to_string());
        assert_eq!(format!("{}", err), "Malformed frame: bad version");

        let err = SockweaveError::HandshakeFailed("no ack".to_string());
        assert_eq!(format!("{}", err), "Handshake failed: no ack");

        let err = SockweaveError::DialFailed("connection refused".to_string());
        assert_eq!(format!("{}", err), "Dial failed: connection refused");

        let err = SockweaveError::UnknownStream(42);
        assert_eq!(format!("{}", err), "Unknown stream: 42");

        let err = SockweaveError::LinkBroken("reset by peer".to_string());
        assert_eq!(format!("{}", err), "Link broken: reset by peer");

        let err = SockweaveError::Timeout("handshake".to_string());
        assert_eq!(format!("{}", err), "Timeout: handshake");
    }

    #[test]
    fn test_socks4_error_display() {
        let err = Socks4Error::UnsupportedVersion(5);
        assert_eq!(format!("{}", err), "Unsupported SOCKS version: 5");

        let err = Socks4Error::CommandNotSupported(2);
        assert_eq!(format!("{}", err), "Command not supported: 2");

        let err = Socks4Error::TruncatedRequest;
        assert_eq!(format!("{}", err), "Truncated request");

        let err = Socks4Error::IdentTooLong(300);
        assert_eq!(
            format!("{}", err),
            "Identification string too long (300 bytes)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "io error");
        let err: SockweaveError = io_err.into();
        assert!(matches!(err, SockweaveError::Io(_)));
    }

    #[test]
    fn test_error_from_socks4() {
        let socks_err = Socks4Error::UnsupportedVersion(5);
        let err: SockweaveError = socks_err.into();
        assert!(matches!(err, SockweaveError::Socks4(_)));
    }

    #[test]
    fn test_is_fatal() {
        assert!(SockweaveError::LinkBroken("gone".to_string()).is_fatal());
        assert!(!SockweaveError::UnknownStream(1).is_fatal());
        assert!(!SockweaveError::DialFailed("refused".to_string()).is_fatal());
    }
}

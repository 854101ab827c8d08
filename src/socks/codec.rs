//! SOCKS4 codec
//!
//! Reads requests from and writes replies to application sockets.
//! Pure `decode_request` / `encode_reply` variants exist for callers
//! that already hold a complete buffer (and for tests).

use super::types::{
    Socks4Command, Socks4Reply, Socks4Request, SOCKS4_VERSION,
};
use crate::error::{Socks4Error, SockweaveError};
use std::net::Ipv4Addr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Fixed-size prefix of a request: ver, cmd, dstport, dstip
const REQUEST_PREFIX_LEN: usize = 8;

/// Upper bound on the identification string, to bound the handshake read
const MAX_IDENT_LEN: usize = 255;

/// Decode a complete SOCKS4 request from a buffer
///
/// The buffer must contain the whole request including the zero byte that
/// terminates the identification string.
pub fn decode_request(buf: &[u8]) -> Result<Socks4Request, Socks4Error> {
    if buf.len() < REQUEST_PREFIX_LEN {
        return Err(Socks4Error::TruncatedRequest);
    }

    let ver = buf[0];
    if ver != SOCKS4_VERSION {
        return Err(Socks4Error::UnsupportedVersion(ver));
    }

    let command = Socks4Command::try_from(buf[1])?;
    let dstport = u16::from_be_bytes([buf[2], buf[3]]);
    let dstip = Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]);

    let rest = &buf[REQUEST_PREFIX_LEN..];
    let ident = match rest.iter().position(|&b| b == 0) {
        Some(pos) => rest[..pos].to_vec(),
        None => return Err(Socks4Error::UnterminatedIdent),
    };
    if ident.len() > MAX_IDENT_LEN {
        return Err(Socks4Error::IdentTooLong(ident.len()));
    }

    Ok(Socks4Request {
        command,
        dstport,
        dstip,
        ident,
    })
}

/// Encode a SOCKS4 reply into its 8-byte wire form
pub fn encode_reply(reply: &Socks4Reply) -> [u8; 8] {
    let port = reply.dstport.to_be_bytes();
    let ip = reply.dstip.octets();
    [
        0, // reply version byte is always zero
        reply.code as u8,
        port[0],
        port[1],
        ip[0],
        ip[1],
        ip[2],
        ip[3],
    ]
}

/// Read one SOCKS4 request from an application socket
///
/// Reads the 8-byte prefix then consumes the identification string up to
/// its zero terminator. The caller is responsible for wrapping this in a
/// timeout so a stalled handshake cannot pin the accept path.
pub async fn read_request<R: AsyncRead + Unpin>(
    conn: &mut R,
) -> Result<Socks4Request, SockweaveError> {
    let mut prefix = [0u8; REQUEST_PREFIX_LEN];
    conn.read_exact(&mut prefix).await?;

    let ver = prefix[0];
    if ver != SOCKS4_VERSION {
        return Err(Socks4Error::UnsupportedVersion(ver).into());
    }
    let command = Socks4Command::try_from(prefix[1])?;
    let dstport = u16::from_be_bytes([prefix[2], prefix[3]]);
    let dstip = Ipv4Addr::new(prefix[4], prefix[5], prefix[6], prefix[7]);

    let mut ident = Vec::new();
    loop {
        let b = conn.read_u8().await?;
        if b == 0 {
            break;
        }
        ident.push(b);
        if ident.len() > MAX_IDENT_LEN {
            return Err(Socks4Error::IdentTooLong(ident.len()).into());
        }
    }

    Ok(Socks4Request {
        command,
        dstport,
        dstip,
        ident,
    })
}

/// Write one SOCKS4 reply to an application socket
pub async fn write_reply<W: AsyncWrite + Unpin>(
    conn: &mut W,
    reply: &Socks4Reply,
) -> Result<(), SockweaveError> {
    conn.write_all(&encode_reply(reply)).await?;
    conn.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socks::Socks4ReplyCode;

    fn connect_request_bytes() -> Vec<u8> {
        // ver=4, cmd=CONNECT, dstport=80, dstip=93.184.216.34, ident="fred\0"
        let mut buf = vec![4, 1, 0, 80, 93, 184, 216, 34];
        buf.extend_from_slice(b"fred\0");
        buf
    }

    #[test]
    fn test_decode_connect_request() {
        let req = decode_request(&connect_request_bytes()).unwrap();
        assert_eq!(req.command, Socks4Command::Connect);
        assert_eq!(req.dstport, 80);
        assert_eq!(req.dstip, Ipv4Addr::new(93, 184, 216, 34));
        assert_eq!(req.ident, b"fred");
    }

    #[test]
    fn test_decode_empty_ident() {
        let buf = vec![4, 1, 0x1F, 0x90, 127, 0, 0, 1, 0];
        let req = decode_request(&buf).unwrap();
        assert_eq!(req.dstport, 8080);
        assert!(req.ident.is_empty());
    }

    #[test]
    fn test_decode_bad_version() {
        let mut buf = connect_request_bytes();
        buf[0] = 5;
        assert!(matches!(
            decode_request(&buf),
            Err(Socks4Error::UnsupportedVersion(5))
        ));
    }

    #[test]
    fn test_decode_bind_parses_but_is_bind() {
        let mut buf = connect_request_bytes();
        buf[1] = 2;
        let req = decode_request(&buf).unwrap();
        assert_eq!(req.command, Socks4Command::Bind);
    }

    #[test]
    fn test_decode_unknown_command() {
        let mut buf = connect_request_bytes();
        buf[1] = 9;
        assert!(matches!(
            decode_request(&buf),
            Err(Socks4Error::CommandNotSupported(9))
        ));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_request(&[4, 1, 0]),
            Err(Socks4Error::TruncatedRequest)
        ));
    }

    #[test]
    fn test_decode_unterminated_ident() {
        let mut buf = vec![4, 1, 0, 80, 1, 2, 3, 4];
        buf.extend_from_slice(b"no-terminator");
        assert!(matches!(
            decode_request(&buf),
            Err(Socks4Error::UnterminatedIdent)
        ));
    }

    #[test]
    fn test_encode_granted_reply() {
        let reply = Socks4Reply::granted(7, Ipv4Addr::new(10, 0, 0, 1));
        let bytes = encode_reply(&reply);
        assert_eq!(bytes, [0, 0x5A, 0, 7, 10, 0, 0, 1]);
    }

    #[test]
    fn test_encode_failed_reply() {
        let bytes = encode_reply(&Socks4Reply::failed());
        assert_eq!(bytes, [0, 0x5B, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_read_request_from_stream() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        tokio::spawn(async move {
            client
                .write_all(&connect_request_bytes())
                .await
                .unwrap();
        });

        let req = read_request(&mut server).await.unwrap();
        assert_eq!(req.command, Socks4Command::Connect);
        assert_eq!(req.dstport, 80);
        assert_eq!(req.ident, b"fred");
    }

    #[tokio::test]
    async fn test_read_request_rejects_wrong_version() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        tokio::spawn(async move {
            let mut buf = connect_request_bytes();
            buf[0] = 5;
            client.write_all(&buf).await.unwrap();
        });

        let result = read_request(&mut server).await;
        assert!(matches!(
            result,
            Err(SockweaveError::Socks4(Socks4Error::UnsupportedVersion(5)))
        ));
    }

    #[tokio::test]
    async fn test_read_request_caps_ident_length() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        tokio::spawn(async move {
            let mut buf = vec![4, 1, 0, 80, 1, 2, 3, 4];
            buf.extend_from_slice(&[b'x'; 300]);
            buf.push(0);
            client.write_all(&buf).await.unwrap();
        });

        let result = read_request(&mut server).await;
        assert!(matches!(
            result,
            Err(SockweaveError::Socks4(Socks4Error::IdentTooLong(_)))
        ));
    }

    #[tokio::test]
    async fn test_write_reply_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let reply = Socks4Reply::granted(3, Ipv4Addr::new(127, 0, 0, 1));
        write_reply(&mut client, &reply).await.unwrap();

        let mut buf = [0u8; 8];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf[0], 0);
        assert_eq!(buf[1], Socks4ReplyCode::Granted as u8);
        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), 3);
    }

    #[tokio::test]
    async fn test_read_request_split_across_reads() {
        // The prefix and ident may straggle in over several reads
        let mut mock = tokio_test::io::Builder::new()
            .read(&[4, 1, 0, 80])
            .read(&[93, 184, 216, 34])
            .read(b"fred\0")
            .build();

        let req = read_request(&mut mock).await.unwrap();
        assert_eq!(req.command, Socks4Command::Connect);
        assert_eq!(req.dstport, 80);
        assert_eq!(req.dstip, Ipv4Addr::new(93, 184, 216, 34));
        assert_eq!(req.ident, b"fred");
    }

    #[tokio::test]
    async fn test_write_reply_exact_wire_bytes() {
        let mut mock = tokio_test::io::Builder::new()
            .write(&[0, 0x5A, 0, 3, 127, 0, 0, 1])
            .build();

        let reply = Socks4Reply::granted(3, Ipv4Addr::new(127, 0, 0, 1));
        write_reply(&mut mock, &reply).await.unwrap();
    }
}

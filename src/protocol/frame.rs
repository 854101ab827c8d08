//! Frame encoding/decoding for the multiplex protocol
//!
//! Frame layout (all integers big-endian):
//! ```text
//! +--------+--------+----------------+------------------+----------------+---------+
//! | Ver(1) | Type(1)| Stream ID (4B) |   Offset (8B)    | Length (4B)    | Payload |
//! +--------+--------+----------------+------------------+----------------+---------+
//! ```
//!
//! The offset is the byte position of a DATA payload within its stream;
//! it is zero for the other frame types. An OPEN payload carries the
//! destination as 4 address octets followed by a 2-byte port.

use crate::error::SockweaveError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

/// Wire protocol version
pub const PROTO_VERSION: u8 = 1;

/// Fixed header size in bytes
pub const FRAME_HEADER_LEN: usize = 18;

/// Maximum payload carried by one frame
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    /// Open a new stream; payload names the destination
    Open = 0x01,
    /// Acknowledge a successful open (destination dialed)
    OpenAck = 0x02,
    /// Stream data chunk at the given offset
    Data = 0x03,
    /// Close a stream (EOF, error, or dial failure)
    Close = 0x04,
}

impl TryFrom<u8> for FrameType {
    type Error = SockweaveError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(FrameType::Open),
            0x02 => Ok(FrameType::OpenAck),
            0x03 => Ok(FrameType::Data),
            0x04 => Ok(FrameType::Close),
            other => Err(SockweaveError::MalformedFrame(format!(
                "unknown frame type {}",
                other
            ))),
        }
    }
}

/// One unit on the link, tagged with the stream it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type
    pub frame_type: FrameType,
    /// Stream identifier
    pub stream_id: u32,
    /// Byte position of the payload within the stream (DATA only)
    pub offset: u64,
    /// Payload (DATA chunk or OPEN destination)
    pub payload: Bytes,
}

impl Frame {
    /// Create an OPEN frame for the given destination
    pub fn open(stream_id: u32, dstip: Ipv4Addr, dstport: u16) -> Self {
        let mut payload = BytesMut::with_capacity(6);
        payload.put_slice(&dstip.octets());
        payload.put_u16(dstport);
        Frame {
            frame_type: FrameType::Open,
            stream_id,
            offset: 0,
            payload: payload.freeze(),
        }
    }

    /// Create an OPEN_ACK frame
    pub fn open_ack(stream_id: u32) -> Self {
        Frame {
            frame_type: FrameType::OpenAck,
            stream_id,
            offset: 0,
            payload: Bytes::new(),
        }
    }

    /// Create a DATA frame carrying a chunk at the given stream offset
    pub fn data(stream_id: u32, offset: u64, payload: Bytes) -> Self {
        Frame {
            frame_type: FrameType::Data,
            stream_id,
            offset,
            payload,
        }
    }

    /// Create a CLOSE frame
    pub fn close(stream_id: u32) -> Self {
        Frame {
            frame_type: FrameType::Close,
            stream_id,
            offset: 0,
            payload: Bytes::new(),
        }
    }

    /// Parse the destination carried by an OPEN payload
    pub fn open_destination(&self) -> Result<(Ipv4Addr, u16), SockweaveError> {
        if self.frame_type != FrameType::Open {
            return Err(SockweaveError::MalformedFrame(
                "destination requested from non-OPEN frame".to_string(),
            ));
        }
        if self.payload.len() != 6 {
            return Err(SockweaveError::MalformedFrame(format!(
                "OPEN payload must be 6 bytes, got {}",
                self.payload.len()
            )));
        }
        let p = &self.payload;
        let ip = Ipv4Addr::new(p[0], p[1], p[2], p[3]);
        let port = u16::from_be_bytes([p[4], p[5]]);
        Ok((ip, port))
    }

    /// Encode this frame to bytes
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        buf.put_u8(PROTO_VERSION);
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.stream_id);
        buf.put_u64(self.offset);
        buf.put_u32(self.payload.len() as u32);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decode one frame from the front of `buf`
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete
    /// frame; callers reading from a streaming transport must treat that
    /// as "need more bytes", not as corruption.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, SockweaveError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let ver = buf[0];
        if ver != PROTO_VERSION {
            return Err(SockweaveError::MalformedFrame(format!(
                "unsupported protocol version {}",
                ver
            )));
        }
        let frame_type = FrameType::try_from(buf[1])?;
        let payload_len = u32::from_be_bytes([buf[14], buf[15], buf[16], buf[17]]) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(SockweaveError::MalformedFrame(format!(
                "payload length {} exceeds maximum {}",
                payload_len, MAX_PAYLOAD_LEN
            )));
        }

        if buf.len() < FRAME_HEADER_LEN + payload_len {
            return Ok(None);
        }

        buf.advance(2);
        let stream_id = buf.get_u32();
        let offset = buf.get_u64();
        buf.advance(4); // payload length, already read
        let payload = buf.split_to(payload_len).freeze();

        Ok(Some(Frame {
            frame_type,
            stream_id,
            offset,
            payload,
        }))
    }
}

//! Streaming frame codec
//!
//! [`FrameReader`] pulls complete frames off an ordered byte stream,
//! buffering partial reads internally. [`write_frame`] serializes one
//! frame onto the link; serialization of concurrent writers happens
//! upstream in the link writer task, so frames are never interleaved.

use super::frame::{Frame, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::error::SockweaveError;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Initial capacity of the read buffer
const READ_BUF_CAPACITY: usize = 16 * 1024;

/// Reads frames from an ordered, reliable byte stream
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a stream in a frame reader
    pub fn new(inner: R) -> Self {
        FrameReader {
            inner,
            buf: BytesMut::with_capacity(READ_BUF_CAPACITY),
        }
    }

    /// Read the next complete frame
    ///
    /// Returns `Ok(None)` on clean EOF at a frame boundary. EOF in the
    /// middle of a frame is reported as [`SockweaveError::LinkBroken`].
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, SockweaveError> {
        loop {
            if let Some(frame) = Frame::decode(&mut self.buf)? {
                return Ok(Some(frame));
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(SockweaveError::LinkBroken(format!(
                    "link closed mid-frame with {} bytes pending",
                    self.buf.len()
                )));
            }
        }
    }

    /// Consume the reader, returning the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Write one frame to the link and flush it
pub async fn write_frame<W: AsyncWrite + Unpin>(
    conn: &mut W,
    frame: &Frame,
) -> Result<(), SockweaveError> {
    debug_assert!(frame.payload.len() <= MAX_PAYLOAD_LEN);
    let encoded = frame.encode();
    debug_assert!(encoded.len() >= FRAME_HEADER_LEN);
    conn.write_all(&encoded).await?;
    conn.flush().await?;
    Ok(())
}

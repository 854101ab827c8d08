//! Link writer
//!
//! Exactly one task per session owns the link's write half. Every pump
//! enqueues frames through a cloned `mpsc::Sender`; the queue serializes
//! them so partial frames from different streams are never interleaved
//! on the wire. Queue FIFO order also preserves each stream's
//! non-decreasing offset order as produced by its ingress pump.

use crate::error::SockweaveError;
use crate::protocol::{write_frame, Frame};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Depth of the shared outbound frame queue
pub const LINK_QUEUE_DEPTH: usize = 1024;

/// Spawn the single writer task for one direction of the link
///
/// The task drains the queue until every sender is dropped, then flushes
/// and exits. A write failure is fatal for the session and surfaces as
/// [`SockweaveError::LinkBroken`] through the join handle.
pub fn spawn_link_writer<W>(
    mut writer: W,
) -> (mpsc::Sender<Frame>, JoinHandle<Result<(), SockweaveError>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Frame>(LINK_QUEUE_DEPTH);

    let handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            trace!(
                stream_id = frame.stream_id,
                frame_type = ?frame.frame_type,
                offset = frame.offset,
                len = frame.payload.len(),
                "link write"
            );
            write_frame(&mut writer, &frame)
                .await
                .map_err(|e| SockweaveError::LinkBroken(format!("link write failed: {}", e)))?;
        }
        debug!("link writer drained, shutting down");
        Ok(())
    });

    (tx, handle)
}

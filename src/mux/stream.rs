//! Per-stream pumps
//!
//! Each live stream runs exactly two pumps. The ingress pump reads the
//! stream's local socket in chunks, tags each chunk with the read cursor
//! and enqueues DATA frames to the link writer. The egress pump drains
//! events dispatched by the link reader and writes bytes to the socket
//! in ascending, gapless offset order via the reassembly buffer.
//!
//! The same code serves both roles: on the client the socket is the
//! accepted application connection, on the relay it is the outbound
//! connection to the true destination.

use super::reassembly::ReassemblyBuffer;
use super::table::StreamTable;
use crate::protocol::Frame;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

/// Chunk size for ingress socket reads
pub const STREAM_CHUNK_SIZE: usize = 16 * 1024;

/// Depth of a stream's inbound event queue
pub const STREAM_EVENT_QUEUE_DEPTH: usize = 256;

/// Events dispatched from the link reader to one stream's egress pump
#[derive(Debug)]
pub enum StreamEvent {
    /// A DATA frame addressed to this stream
    Data {
        /// Byte position of the chunk within the stream
        offset: u64,
        /// Chunk payload
        payload: Bytes,
    },
    /// The peer closed this stream (or the session is shutting down)
    Close,
}

/// Run both pumps for one stream until it closes, then deregister it
///
/// The caller must have inserted the stream's event sender into `table`
/// before calling. The entry is removed on the way out regardless of how
/// the stream ended, so subsequent frames for this id are reported as
/// unknown rather than delivered to a dead pump.
pub async fn run_stream<S>(
    stream_id: u32,
    socket: S,
    link_tx: mpsc::Sender<Frame>,
    events: mpsc::Receiver<StreamEvent>,
    table: StreamTable,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(socket);

    // Either pump flipping this flag stops the other promptly, without
    // waiting on its socket I/O.
    let (closed_tx, closed_rx) = watch::channel(false);
    let closed_tx = Arc::new(closed_tx);

    let ingress = run_ingress(
        stream_id,
        read_half,
        link_tx.clone(),
        closed_tx.clone(),
        closed_rx.clone(),
    );
    let egress = run_egress(
        stream_id,
        write_half,
        events,
        link_tx,
        closed_tx,
        closed_rx,
    );

    let (sent, delivered) = tokio::join!(ingress, egress);
    table.remove(stream_id);

    debug!(
        stream_id,
        bytes_sent = sent,
        bytes_delivered = delivered,
        "stream closed"
    );
}

/// Socket → link: tag chunks with the read cursor and enqueue DATA frames
///
/// Returns the final read cursor (bytes read from the socket). Emits a
/// CLOSE frame when the socket reaches EOF or fails; emits nothing when
/// cancelled by the egress side, since the peer initiated that close.
async fn run_ingress<R>(
    stream_id: u32,
    mut socket: R,
    link_tx: mpsc::Sender<Frame>,
    closed: Arc<watch::Sender<bool>>,
    mut closed_rx: watch::Receiver<bool>,
) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut read_cursor: u64 = 0;
    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];

    loop {
        tokio::select! {
            result = socket.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        trace!(stream_id, "ingress EOF");
                        let _ = link_tx.send(Frame::close(stream_id)).await;
                        break;
                    }
                    Ok(n) => {
                        let chunk = Bytes::copy_from_slice(&buf[..n]);
                        let frame = Frame::data(stream_id, read_cursor, chunk);
                        if link_tx.send(frame).await.is_err() {
                            // Link writer gone; session is tearing down
                            break;
                        }
                        read_cursor += n as u64;
                    }
                    Err(e) => {
                        warn!(stream_id, phase = "ingress", error = %e, "socket read failed");
                        let _ = link_tx.send(Frame::close(stream_id)).await;
                        break;
                    }
                }
            }
            _ = closed_rx.changed() => {
                trace!(stream_id, "ingress cancelled");
                break;
            }
        }
    }

    let _ = closed.send(true);
    read_cursor
}

/// Link → socket: reassemble DATA events and write them in order
///
/// Returns the final write cursor (bytes delivered to the socket).
async fn run_egress<W>(
    stream_id: u32,
    mut socket: W,
    mut events: mpsc::Receiver<StreamEvent>,
    link_tx: mpsc::Sender<Frame>,
    closed: Arc<watch::Sender<bool>>,
    mut closed_rx: watch::Receiver<bool>,
) -> u64
where
    W: AsyncWrite + Unpin,
{
    let mut reassembly = ReassemblyBuffer::new();

    'outer: loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(StreamEvent::Data { offset, payload }) => {
                        for chunk in reassembly.insert(offset, payload) {
                            if let Err(e) = socket.write_all(&chunk).await {
                                warn!(stream_id, phase = "egress", error = %e, "socket write failed");
                                let _ = link_tx.send(Frame::close(stream_id)).await;
                                break 'outer;
                            }
                        }
                    }
                    Some(StreamEvent::Close) => {
                        trace!(stream_id, "egress close event");
                        break;
                    }
                    None => {
                        // Table entry dropped without a close event
                        break;
                    }
                }
            }
            _ = closed_rx.changed() => {
                trace!(stream_id, "egress cancelled");
                break;
            }
        }
    }

    let _ = socket.shutdown().await;
    let _ = closed.send(true);
    reassembly.write_cursor()
}

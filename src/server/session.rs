//! Relay-side session handling
//!
//! One session per connected link. The session's reader loop owns frame
//! dispatch: OPEN frames dial the requested destination and start a new
//! stream, DATA and CLOSE frames are routed to the stream's pumps
//! through the table. Dial failures answer with CLOSE instead of
//! OPEN_ACK and never create a table entry that outlives the failure.

use crate::config::ServerConfig;
use crate::error::SockweaveError;
use crate::mux::{
    run_stream, spawn_link_writer, StreamEvent, StreamTable, STREAM_EVENT_QUEUE_DEPTH,
};
use crate::protocol::{Frame, FrameReader, FrameType};
use crate::transport::SocketOpts;
use anyhow::Result;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Run one relay session over an established link
///
/// Returns when the link fails, the client closes it, or shutdown is
/// requested. Every live stream is closed before returning.
pub async fn run_session(
    link: TcpStream,
    config: ServerConfig,
    mut shutdown_rx: broadcast::Receiver<bool>,
) -> Result<()> {
    if let Err(e) = SocketOpts::for_link().apply(&link) {
        debug!("Failed to apply link socket options: {}", e);
    }

    let (link_read, link_write) = link.into_split();
    let (link_tx, writer_handle) = spawn_link_writer(link_write);

    let table = StreamTable::new();
    let mut reader = FrameReader::new(link_read);
    let dial_timeout = Duration::from_secs(config.dial_timeout);

    let result = loop {
        tokio::select! {
            read = reader.read_frame() => {
                match read {
                    Ok(Some(frame)) => {
                        handle_frame(frame, &table, &link_tx, dial_timeout).await;
                    }
                    Ok(None) => {
                        info!("Link closed by client");
                        break Ok(());
                    }
                    Err(e) => {
                        break Err(anyhow::Error::new(e).context("Link lost"));
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, closing session");
                break Ok(());
            }
        }
    };

    table.close_all().await;
    drop(link_tx);
    match writer_handle.await {
        Ok(Ok(())) | Err(_) => {}
        Ok(Err(e)) => debug!("Link writer ended with: {}", e),
    }

    result
}

/// Dispatch one frame from the link
async fn handle_frame(
    frame: Frame,
    table: &StreamTable,
    link_tx: &mpsc::Sender<Frame>,
    dial_timeout: Duration,
) {
    let stream_id = frame.stream_id;
    match frame.frame_type {
        FrameType::Open => {
            if table.contains(stream_id) {
                warn!(stream_id, "duplicate OPEN, dropped");
                return;
            }

            let (dstip, dstport) = match frame.open_destination() {
                Ok(dest) => dest,
                Err(e) => {
                    warn!(stream_id, phase = "open", "{}", e);
                    let _ = link_tx.send(Frame::close(stream_id)).await;
                    return;
                }
            };

            // Register the event channel before acknowledging so DATA
            // frames racing the dial buffer instead of going unknown.
            let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(STREAM_EVENT_QUEUE_DEPTH);
            if table.insert(stream_id, event_tx).is_err() {
                warn!(stream_id, "duplicate OPEN, dropped");
                return;
            }

            let table = table.clone();
            let link_tx = link_tx.clone();
            tokio::spawn(async move {
                open_stream(stream_id, dstip, dstport, event_rx, table, link_tx, dial_timeout)
                    .await;
            });
        }
        FrameType::Data => {
            let event = StreamEvent::Data {
                offset: frame.offset,
                payload: frame.payload,
            };
            if let Err(e) = table.dispatch(stream_id, event).await {
                // The peer already tore the stream down; drop the frame
                warn!(stream_id, phase = "link-read", "{}, frame dropped", e);
            }
        }
        FrameType::Close => {
            if let Err(e) = table.dispatch(stream_id, StreamEvent::Close).await {
                debug!(stream_id, phase = "link-read", "{}", e);
            }
        }
        FrameType::OpenAck => {
            warn!(stream_id, "unexpected OPEN_ACK from client, dropped");
        }
    }
}

/// Dial the destination for a newly opened stream and run its pumps
///
/// Success sends OPEN_ACK before any data can flow back; failure sends
/// CLOSE and removes the provisional table entry.
async fn open_stream(
    stream_id: u32,
    dstip: Ipv4Addr,
    dstport: u16,
    event_rx: mpsc::Receiver<StreamEvent>,
    table: StreamTable,
    link_tx: mpsc::Sender<Frame>,
    dial_timeout: Duration,
) {
    let dest = SocketAddr::V4(SocketAddrV4::new(dstip, dstport));
    info!(stream_id, %dest, "dialing destination");

    let socket = match tokio::time::timeout(dial_timeout, TcpStream::connect(dest)).await {
        Ok(Ok(socket)) => socket,
        Ok(Err(e)) => {
            warn!(
                stream_id,
                %dest,
                phase = "dial",
                "{}",
                SockweaveError::DialFailed(e.to_string())
            );
            table.remove(stream_id);
            let _ = link_tx.send(Frame::close(stream_id)).await;
            return;
        }
        Err(_) => {
            warn!(
                stream_id,
                %dest,
                phase = "dial",
                "{}",
                SockweaveError::Timeout(format!("dial to {}", dest))
            );
            table.remove(stream_id);
            let _ = link_tx.send(Frame::close(stream_id)).await;
            return;
        }
    };

    if let Err(e) = SocketOpts::for_stream().apply(&socket) {
        debug!(stream_id, "Failed to apply socket options: {}", e);
    }

    if link_tx.send(Frame::open_ack(stream_id)).await.is_err() {
        // Link writer gone; the session is tearing down
        table.remove(stream_id);
        return;
    }

    info!(stream_id, %dest, "stream opened");
    run_stream(stream_id, socket, link_tx, event_rx, table).await;
}

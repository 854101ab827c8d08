//! Client endpoint implementation
//!
//! One session is one connected link plus the streams multiplexed over
//! it. The accept loop, the link reader and each stream's pumps all run
//! concurrently; the stream table and the pending-open map are the only
//! shared state, each behind its own short-lived lock.

use crate::config::ClientConfig;
use crate::error::SockweaveError;
use crate::mux::{
    run_stream, spawn_link_writer, StreamEvent, StreamTable, STREAM_EVENT_QUEUE_DEPTH,
};
use crate::protocol::{Frame, FrameReader, FrameType};
use crate::socks::{read_request, write_reply, Socks4Command, Socks4Reply};
use crate::transport::{RelayAddr, SocketOpts, TcpTransport, Transport};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Handshakes waiting for the relay's OPEN_ACK, keyed by stream id.
/// `true` resolves the open as granted, `false` as refused.
type PendingOpens = Arc<Mutex<HashMap<u32, oneshot::Sender<bool>>>>;

/// Local proxy endpoint
pub struct Client {
    config: ClientConfig,
    listener: TcpListener,
}

impl Client {
    /// Validate the configuration and bind the SOCKS4 listener
    pub async fn bind(config: ClientConfig) -> Result<Self> {
        config
            .validate()
            .map_err(SockweaveError::Config)
            .context("Invalid client configuration")?;

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind SOCKS listener on {}", config.listen_addr))?;

        info!("SOCKS4 listener bound on {}", config.listen_addr);
        Ok(Client { config, listener })
    }

    /// Address the SOCKS4 listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run sessions until shutdown, reconnecting the link with backoff
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let transport =
            TcpTransport::new(&self.config.transport).context("Failed to create transport")?;
        let remote = RelayAddr::new(&self.config.remote_addr);

        let base_delay = Duration::from_secs(1);
        let max_delay = Duration::from_secs(60);
        let mut attempt: u32 = 0;

        loop {
            match self.run_session(&transport, &remote, &mut shutdown_rx).await {
                Ok(()) => {
                    info!("Client stopped");
                    return Ok(());
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_reconnects {
                        error!("Max reconnects exceeded, giving up");
                        return Err(e);
                    }

                    let delay =
                        std::cmp::min(base_delay * 2u32.saturating_pow(attempt - 1), max_delay);
                    warn!(
                        "Session error: {:#}. Reconnecting in {:?}... (attempt {}/{})",
                        e, delay, attempt, self.config.max_reconnects
                    );
                    remote.invalidate().await;

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown_rx.recv() => {
                            info!("Shutdown during reconnect wait");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Run one session: connect the link, then accept and tunnel streams
    /// until the link fails or shutdown is requested.
    ///
    /// Returns `Ok(())` only on shutdown; a broken link is an error so
    /// the caller reconnects.
    async fn run_session(
        &self,
        transport: &TcpTransport,
        remote: &RelayAddr,
        shutdown_rx: &mut broadcast::Receiver<bool>,
    ) -> Result<()> {
        info!("Connecting link to relay: {}", remote.addr());
        let link = transport
            .connect(remote)
            .await
            .context("Failed to connect link to relay")?;
        info!("Link established");

        let (link_read, link_write) = link.into_split();
        let (link_tx, writer_handle) = spawn_link_writer(link_write);

        let table = StreamTable::new();
        let pending: PendingOpens = Default::default();
        let next_stream_id = Arc::new(AtomicU32::new(1));

        let reader_table = table.clone();
        let reader_pending = pending.clone();
        let mut reader_handle = tokio::spawn(async move {
            run_link_reader(FrameReader::new(link_read), reader_table, reader_pending).await
        });

        let handshake_timeout = Duration::from_secs(self.config.handshake_timeout);

        let result = loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((conn, peer)) => {
                            debug!("Accepted application connection from {}", peer);
                            let ctx = HandshakeContext {
                                link_tx: link_tx.clone(),
                                table: table.clone(),
                                pending: pending.clone(),
                                next_stream_id: next_stream_id.clone(),
                                handshake_timeout,
                            };
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(conn, ctx).await {
                                    warn!("Connection handling failed: {:#}", e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Accept failed: {}", e);
                        }
                    }
                }
                reader_result = &mut reader_handle => {
                    let err = match reader_result {
                        Ok(Err(e)) => anyhow::Error::new(e),
                        Ok(Ok(())) => anyhow::anyhow!("link reader exited unexpectedly"),
                        Err(join_err) => anyhow::Error::new(join_err),
                    };
                    break Err(err.context("Link lost"));
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, closing session");
                    reader_handle.abort();
                    break Ok(());
                }
            }
        };

        // Session teardown: fail queued handshakes, close every stream,
        // then let the writer drain and exit.
        pending.lock().unwrap().clear();
        table.close_all().await;
        drop(link_tx);
        match writer_handle.await {
            Ok(Ok(())) | Err(_) => {}
            Ok(Err(e)) => debug!("Link writer ended with: {}", e),
        }

        result
    }
}

/// Shared handles a single handshake task needs
struct HandshakeContext {
    link_tx: mpsc::Sender<Frame>,
    table: StreamTable,
    pending: PendingOpens,
    next_stream_id: Arc<AtomicU32>,
    handshake_timeout: Duration,
}

/// Perform the SOCKS4 handshake for one application connection and, on
/// success, run the stream pumps until the stream closes.
async fn handle_connection(mut conn: TcpStream, ctx: HandshakeContext) -> Result<()> {
    // Exactly one handshake read, bounded
    let request = match tokio::time::timeout(ctx.handshake_timeout, read_request(&mut conn)).await
    {
        Ok(Ok(req)) => req,
        Ok(Err(e)) => {
            warn!(phase = "handshake", "Bad SOCKS4 request: {}", e);
            let _ = write_reply(&mut conn, &Socks4Reply::failed()).await;
            return Err(e.into());
        }
        Err(_) => {
            warn!(phase = "handshake", "SOCKS4 request timed out");
            let _ = write_reply(&mut conn, &Socks4Reply::failed()).await;
            return Err(SockweaveError::Timeout("SOCKS4 handshake".to_string()).into());
        }
    };

    // BIND is rejected, not silently ignored
    if request.command != Socks4Command::Connect {
        warn!(
            phase = "handshake",
            "Rejecting unsupported command {:?}", request.command
        );
        let _ = write_reply(&mut conn, &Socks4Reply::failed()).await;
        return Err(SockweaveError::HandshakeFailed(format!(
            "unsupported command {:?}",
            request.command
        ))
        .into());
    }

    let stream_id = ctx.next_stream_id.fetch_add(1, Ordering::Relaxed);
    debug!(
        stream_id,
        dst = %request.dstip,
        port = request.dstport,
        ident = %String::from_utf8_lossy(&request.ident),
        "CONNECT request"
    );

    // Register the event channel before sending OPEN so data frames
    // arriving right after OPEN_ACK buffer instead of hitting an
    // unknown id.
    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(STREAM_EVENT_QUEUE_DEPTH);
    ctx.table
        .insert(stream_id, event_tx)
        .context("Stream id collision")?;

    let (ack_tx, ack_rx) = oneshot::channel();
    ctx.pending.lock().unwrap().insert(stream_id, ack_tx);

    let open = Frame::open(stream_id, request.dstip, request.dstport);
    if ctx.link_tx.send(open).await.is_err() {
        ctx.pending.lock().unwrap().remove(&stream_id);
        ctx.table.remove(stream_id);
        let _ = write_reply(&mut conn, &Socks4Reply::failed()).await;
        return Err(SockweaveError::LinkBroken("link writer gone".to_string()).into());
    }

    let granted = match tokio::time::timeout(ctx.handshake_timeout, ack_rx).await {
        Ok(Ok(granted)) => granted,
        // Session teardown dropped the pending sender
        Ok(Err(_)) => false,
        Err(_) => {
            warn!(stream_id, phase = "handshake", "OPEN_ACK timed out");
            ctx.pending.lock().unwrap().remove(&stream_id);
            ctx.table.remove(stream_id);
            // The relay may finish its dial after the bound; tell it to
            // drop the stream instead of pumping into a forgotten id.
            let _ = ctx.link_tx.send(Frame::close(stream_id)).await;
            let _ = write_reply(&mut conn, &Socks4Reply::failed()).await;
            return Err(SockweaveError::Timeout(format!(
                "OPEN_ACK for stream {}",
                stream_id
            ))
            .into());
        }
    };

    if !granted {
        ctx.table.remove(stream_id);
        let _ = write_reply(&mut conn, &Socks4Reply::failed()).await;
        return Err(SockweaveError::HandshakeFailed(format!(
            "stream {} refused by relay",
            stream_id
        ))
        .into());
    }

    // Exactly one GRANTED reply, before any relaying begins
    if let Err(e) = write_reply(&mut conn, &Socks4Reply::granted(stream_id, request.dstip)).await {
        // The application went away between request and reply; the relay
        // holds a dialed socket for this id until told otherwise.
        ctx.table.remove(stream_id);
        let _ = ctx.link_tx.send(Frame::close(stream_id)).await;
        return Err(anyhow::Error::new(e).context("Failed to send GRANTED reply"));
    }

    if let Err(e) = SocketOpts::for_stream().apply(&conn) {
        debug!(stream_id, "Failed to apply socket options: {}", e);
    }

    info!(stream_id, dst = %request.dstip, port = request.dstport, "stream opened");
    run_stream(stream_id, conn, ctx.link_tx, event_rx, ctx.table).await;
    Ok(())
}

/// Drain frames from the link and dispatch them
///
/// OPEN_ACK and CLOSE resolve pending handshakes; DATA and CLOSE for
/// established streams go through the table. Frames naming an id with
/// no entry are logged and dropped. Returns only on link failure.
async fn run_link_reader<R: AsyncRead + Unpin>(
    mut reader: FrameReader<R>,
    table: StreamTable,
    pending: PendingOpens,
) -> Result<(), SockweaveError> {
    loop {
        let frame = match reader.read_frame().await? {
            Some(frame) => frame,
            None => {
                return Err(SockweaveError::LinkBroken(
                    "link closed by relay".to_string(),
                ))
            }
        };

        let stream_id = frame.stream_id;
        match frame.frame_type {
            FrameType::OpenAck => {
                let waiter = pending.lock().unwrap().remove(&stream_id);
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(true);
                    }
                    None => warn!(stream_id, "OPEN_ACK for unknown handshake, dropped"),
                }
            }
            FrameType::Close => {
                let waiter = pending.lock().unwrap().remove(&stream_id);
                if let Some(tx) = waiter {
                    // Dial failed on the relay side
                    let _ = tx.send(false);
                } else if let Err(e) = table.dispatch(stream_id, StreamEvent::Close).await {
                    debug!(stream_id, phase = "link-read", "{}", e);
                }
            }
            FrameType::Data => {
                let event = StreamEvent::Data {
                    offset: frame.offset,
                    payload: frame.payload,
                };
                if let Err(e) = table.dispatch(stream_id, event).await {
                    // Stream already closed locally; the frame was in flight
                    warn!(stream_id, phase = "link-read", "{}, frame dropped", e);
                }
            }
            FrameType::Open => {
                warn!(stream_id, "unexpected OPEN from relay, dropped");
            }
        }
    }
}

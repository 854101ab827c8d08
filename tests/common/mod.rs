//! Test utilities for Sockweave integration tests
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use sockweave::config::{ClientConfig, ServerConfig, TransportConfig};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Create a connected TCP stream pair for testing
pub async fn create_tcp_stream_pair() -> (TcpStream, TcpStream) {
    let (listener, addr) = create_test_listener().await;

    let connect_fut = TcpStream::connect(addr);
    let accept_fut = listener.accept();

    let (client_stream, accept_result) = tokio::join!(connect_fut, accept_fut);
    let (server_stream, _) = accept_result.unwrap();

    (client_stream.unwrap(), server_stream)
}

/// Server config with a short dial timeout, suitable for tests
pub fn test_server_config(bind_addr: &str) -> ServerConfig {
    ServerConfig {
        bind_addr: bind_addr.to_string(),
        dial_timeout: 2,
    }
}

/// Client config pointed at the given relay, with short timeouts
pub fn test_client_config(remote_addr: &str) -> ClientConfig {
    ClientConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        remote_addr: remote_addr.to_string(),
        handshake_timeout: 2,
        max_reconnects: 1,
        transport: TransportConfig::default(),
    }
}

/// Start a relay on an ephemeral port; returns its address and the
/// shutdown sender that stops it.
pub async fn start_relay() -> (SocketAddr, broadcast::Sender<bool>) {
    let server = sockweave::server::Server::bind(test_server_config("127.0.0.1:0"))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(server.run(shutdown_rx));

    (addr, shutdown_tx)
}

/// Start a local proxy endpoint connected to the given relay; returns
/// its SOCKS4 listener address and the shutdown sender.
pub async fn start_proxy(relay_addr: SocketAddr) -> (SocketAddr, broadcast::Sender<bool>) {
    let client = sockweave::client::Client::bind(test_client_config(&relay_addr.to_string()))
        .await
        .unwrap();
    let addr = client.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(client.run(shutdown_rx));

    (addr, shutdown_tx)
}

/// Start a TCP echo server that answers any number of connections,
/// writing back everything it reads.
pub async fn start_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        loop {
            let (mut conn, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 8192];
                loop {
                    match conn.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => {
                            if conn.write_all(&buf[..n]).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Reserve a port with nothing listening on it
pub async fn closed_port() -> u16 {
    let (listener, addr) = create_test_listener().await;
    drop(listener);
    addr.port()
}

/// Build the bytes of a SOCKS4 request
pub fn socks4_request(cmd: u8, dstport: u16, dstip: [u8; 4], ident: &[u8]) -> Vec<u8> {
    let mut buf = vec![4, cmd];
    buf.extend_from_slice(&dstport.to_be_bytes());
    buf.extend_from_slice(&dstip);
    buf.extend_from_slice(ident);
    buf.push(0);
    buf
}

/// Perform a SOCKS4 CONNECT handshake against the proxy; returns the
/// connected application socket and the 8-byte reply.
pub async fn socks4_connect(
    proxy_addr: SocketAddr,
    dstport: u16,
    dstip: [u8; 4],
) -> (TcpStream, [u8; 8]) {
    let mut conn = TcpStream::connect(proxy_addr).await.unwrap();
    conn.write_all(&socks4_request(1, dstport, dstip, b"test"))
        .await
        .unwrap();

    let mut reply = [0u8; 8];
    conn.read_exact(&mut reply).await.unwrap();
    (conn, reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_listener() {
        let (listener, addr) = create_test_listener().await;
        assert!(addr.port() > 0);
        drop(listener);
    }

    #[tokio::test]
    async fn test_echo_server_round_trip() {
        let addr = start_echo_server().await;
        let mut conn = TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_socks4_request_layout() {
        let request = socks4_request(1, 8080, [10, 0, 0, 1], b"user");
        assert_eq!(request[0], 4);
        assert_eq!(request[1], 1);
        assert_eq!(&request[2..4], &8080u16.to_be_bytes());
        assert_eq!(&request[4..8], &[10, 0, 0, 1]);
        assert_eq!(*request.last().unwrap(), 0);
    }
}

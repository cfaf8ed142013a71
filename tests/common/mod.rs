//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::io::{DuplexStream, duplex};
use tokio::net::TcpListener;
use tokio::time::{Instant, sleep};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::protocol::Role;
use tracing_subscriber::EnvFilter;
use wsduplex::Server;

// ============================================================================
// Constants
// ============================================================================

pub const SERVER_PEM: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/server.pem");
pub const SERVER_KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/server.key");
pub const OTHER_PEM: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/other.pem");

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Identity of every loopback client.
pub const LOOPBACK_ID: &str = "127.0.0.1";

// ============================================================================
// Helpers
// ============================================================================

/// Installs a test log subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Binds a loopback listener and serves plain WebSocket on it.
pub async fn serve(server: &Server) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = server.clone();
    tokio::spawn(async move { server.serve(listener).await });
    Ok(addr)
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<()> {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        if Instant::now() >= deadline {
            bail!("condition not met within {WAIT:?}");
        }
        sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Two connected WebSocket endpoints over an in-memory pipe.
pub async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
    let (a, b) = duplex(64 * 1024);
    let client = WebSocketStream::from_raw_socket(a, Role::Client, None).await;
    let server = WebSocketStream::from_raw_socket(b, Role::Server, None).await;
    (client, server)
}

//! Single-connection client.

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tracing::info;

use crate::error::{Error, Result};
use crate::transport::ConnectionGuard;

use super::dialer::{Dialer, Scheme};

// ============================================================================
// Client
// ============================================================================

/// WebSocket client holding at most one connection.
///
/// All methods take `&self`; share the client behind an `Arc` to write
/// from several tasks while one task runs [`read_loop`](Self::read_loop).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use wsduplex::Client;
///
/// # async fn example() -> wsduplex::Result<()> {
/// let client = Arc::new(Client::new());
/// client.connect("localhost:8080", "/").await?;
///
/// let reader = Arc::clone(&client);
/// tokio::spawn(async move {
///     reader.read_loop(|data| println!("received {} bytes", data.len())).await
/// });
///
/// client.write(b"hello".to_vec()).await?;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Client {
    /// Transport factory used by connect.
    dialer: Dialer,
    /// The one connection.
    guard: ConnectionGuard<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Creates a disconnected client with the default dialer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disconnected client using `dialer`.
    #[inline]
    #[must_use]
    pub fn with_dialer(dialer: Dialer) -> Self {
        Self {
            dialer,
            guard: ConnectionGuard::new(),
        }
    }

    /// Returns the dialer.
    #[inline]
    #[must_use]
    pub fn dialer(&self) -> &Dialer {
        &self.dialer
    }

    /// Connects to `ws://{host_port}{path}`.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyConnected`] if a connection is held
    /// - [`Error::InvalidUrl`] if the target cannot be formed
    /// - [`Error::ConnectionTimeout`] or [`Error::WebSocket`] from the dialer
    pub async fn connect(&self, host_port: &str, path: &str) -> Result<()> {
        self.connect_with(Scheme::Plain, host_port, path).await
    }

    /// Connects to `wss://{host_port}{path}`.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub async fn connect_secure(&self, host_port: &str, path: &str) -> Result<()> {
        self.connect_with(Scheme::Secure, host_port, path).await
    }

    /// Returns `true` while a connection is held.
    pub async fn is_connected(&self) -> bool {
        self.guard.is_connected().await
    }

    /// Sends `data` as one binary frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no connection is held
    /// - [`Error::WebSocket`] if the write fails
    pub async fn write(&self, data: impl Into<Bytes>) -> Result<()> {
        self.guard.send(data).await
    }

    /// Reads binary frames until the server closes, calling `on_message`
    /// for each one.
    ///
    /// Returns `Ok(())` on a clean close from the server, which also
    /// disconnects the client.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no connection is held
    /// - [`Error::UnexpectedFrameType`] on a non-binary frame
    /// - [`Error::WebSocket`] on a transport read failure
    pub async fn read_loop<F>(&self, on_message: F) -> Result<()>
    where
        F: FnMut(Bytes) + Send,
    {
        self.guard.receive_loop(on_message).await
    }

    /// Closes the connection. No-op when disconnected.
    ///
    /// The client may connect again afterwards.
    pub async fn close(&self) {
        self.guard.close().await;
    }

    async fn connect_with(&self, scheme: Scheme, host_port: &str, path: &str) -> Result<()> {
        if self.guard.is_connected().await {
            return Err(Error::AlreadyConnected);
        }

        let url = scheme.url(host_port, path)?;
        info!(%url, "Client connecting");

        let stream = self.dialer.dial(&url).await?;
        self.guard.attach(stream).await
    }
}

// ============================================================================
// Tests
// ============================================================================

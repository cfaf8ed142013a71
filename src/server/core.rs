//! Multi-connection server.
//!
//! # Connection Flow
//!
//! 1. Derive the client id from the peer address
//! 2. Read the upgrade request within the handshake timeout
//! 3. Reserve the id once the request is in hand; a taken id is answered
//!    with `400 Duplicate ID`
//! 4. Finish the upgrade; on failure the reservation is released
//! 5. Run the connect hook
//! 6. Publish the connection under the id
//! 7. Read binary frames into the receive hook until the client leaves
//! 8. Remove the id, then release the connection
//!
//! A connection that completes its upgrade after [`Server::shutdown`] is
//! closed without being published.

// ============================================================================
// Imports
// ============================================================================

use std::future::{Future, ready};
use std::io;
use std::net::SocketAddr;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::transport::Io;

use super::builder::{DEFAULT_HANDSHAKE_TIMEOUT, OnConnect, OnReceive, ServerBuilder};
use super::registry::{Registry, Reservation, ServerConnection};

// ============================================================================
// Constants
// ============================================================================

/// How often the accept loop checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// ServerInner
// ============================================================================

/// State shared by the server, its handlers and connection tasks.
struct ServerInner {
    /// Upgrade path.
    path: String,
    /// Connect hook.
    on_connect: Option<OnConnect>,
    /// Receive hook.
    on_receive: Option<OnReceive>,
    /// Lower-layer WebSocket settings.
    websocket_config: Option<WebSocketConfig>,
    /// Limit on transport setup and on the upgrade request.
    handshake_timeout: Duration,
    /// Live connections by client id.
    registry: Registry,
    /// Stops the accept loops.
    shutdown: AtomicBool,
}

// ============================================================================
// Server
// ============================================================================

/// WebSocket server keyed by client identity.
///
/// Cloning is cheap; clones share one registry.
///
/// # Example
///
/// ```no_run
/// use tokio::net::TcpListener;
/// use wsduplex::Server;
///
/// # async fn example() -> wsduplex::Result<()> {
/// let server = Server::builder()
///     .on_receive(|id, data| println!("{id}: {} bytes", data.len()))
///     .build()?;
///
/// let listener = TcpListener::bind("127.0.0.1:8080").await?;
/// tokio::spawn({
///     let server = server.clone();
///     async move { server.serve(listener).await }
/// });
///
/// server.send("127.0.0.1", b"hello".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Default for Server {
    fn default() -> Self {
        Self::from_parts("/".to_owned(), None, None, None, DEFAULT_HANDSHAKE_TIMEOUT)
    }
}

impl Server {
    /// Creates a server with no hooks, mounted at `/`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for configuring a server.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub(super) fn from_parts(
        path: String,
        on_connect: Option<OnConnect>,
        on_receive: Option<OnReceive>,
        websocket_config: Option<WebSocketConfig>,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                path,
                on_connect,
                on_receive,
                websocket_config,
                handshake_timeout,
                registry: Registry::default(),
                shutdown: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the upgrade path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Returns the handshake limit.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.inner.handshake_timeout
    }

    /// Returns the request handler bound to this server's registry.
    #[inline]
    #[must_use]
    pub fn handler(&self) -> Handler {
        Handler {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Sends `data` as one binary frame to client `id`.
    ///
    /// Writes to one client are serialized by that client's own lock; the
    /// registry lock is released before writing.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidId`](crate::Error::InvalidId) if `id` is not connected
    /// - [`Error::NotConnected`](crate::Error::NotConnected) if the client is
    ///   leaving
    /// - [`Error::WebSocket`](crate::Error::WebSocket) if the write fails
    pub async fn send(&self, id: impl AsRef<str>, data: impl Into<Bytes>) -> Result<()> {
        let connection = self.inner.registry.connection(id.as_ref())?;
        connection.send(data).await
    }

    /// Returns the number of connected clients.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the ids of connected clients, sorted.
    #[must_use]
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.inner.registry.ids()
    }

    /// Returns `true` if `id` is connected.
    #[must_use]
    pub fn is_connected(&self, id: impl AsRef<str>) -> bool {
        self.inner.registry.connection(id.as_ref()).is_ok()
    }

    /// Closes the connection to client `id`.
    ///
    /// A close notice is sent and the read loop stops without waiting for
    /// the client's answer; the entry is removed as that loop ends.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidId`](crate::Error::InvalidId) if `id` is not connected.
    pub async fn disconnect(&self, id: impl AsRef<str>) -> Result<()> {
        let connection = self.inner.registry.connection(id.as_ref())?;
        connection.close().await;
        debug!(client_id = id.as_ref(), "Client disconnected by server");
        Ok(())
    }

    /// Accepts plain TCP connections until [`shutdown`](Self::shutdown).
    ///
    /// Each connection runs [`Handler::handle`] on its own task; failures
    /// are logged and never stop the loop.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.accept_loop(listener, |stream| ready(Ok(stream))).await
    }

    /// Accepts TLS connections until [`shutdown`](Self::shutdown).
    pub async fn serve_tls(&self, listener: TcpListener, acceptor: TlsAcceptor) -> Result<()> {
        self.accept_loop(listener, move |stream| acceptor.accept(stream))
            .await
    }

    /// Stops the accept loops and closes every connection.
    pub async fn shutdown(&self) {
        info!("Server shutting down");
        self.inner.shutdown.store(true, Ordering::SeqCst);

        for connection in self.inner.registry.connections() {
            connection.close().await;
        }

        info!("Server shutdown complete");
    }

    /// Accept loop shared by plain and TLS serving.
    async fn accept_loop<F, Fut, S>(&self, listener: TcpListener, wrap: F) -> Result<()>
    where
        F: Fn(TcpStream) -> Fut,
        Fut: Future<Output = io::Result<S>> + Send + 'static,
        S: Io,
    {
        let local = listener.local_addr()?;
        info!(%local, path = %self.inner.path, "Server listening");

        loop {
            if self.inner.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            // Accept with timeout to allow checking shutdown flag
            let (stream, peer) = match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok(accepted)) => accepted,
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                    continue;
                }
                Err(_) => continue,
            };

            let wrapped = wrap(stream);
            let handler = self.handler();
            let limit = self.inner.handshake_timeout;
            tokio::spawn(async move {
                let stream = match timeout(limit, wrapped).await {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => {
                        warn!(error = %e, %peer, "Transport setup failed");
                        return;
                    }
                    Err(_) => {
                        warn!(%peer, "Transport setup timed out");
                        return;
                    }
                };
                if let Err(e) = handler.handle(stream, peer).await {
                    debug!(error = %e, %peer, "Connection handling ended with error");
                }
            });
        }

        Ok(())
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Upgrade-request handler for one [`Server`].
///
/// Feed it every inbound stream together with its peer address.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<ServerInner>,
}

impl Handler {
    /// Upgrades `stream` and serves it until the client leaves.
    ///
    /// Returns `Ok(())` when the client closes cleanly, when the server
    /// closes it, or when the server is shutting down as the upgrade
    /// completes.
    ///
    /// The id is claimed only once the upgrade request has arrived, so a
    /// peer that connects and stays silent never blocks its own id.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateId`](crate::Error::DuplicateId) if the peer's id is
    ///   already registered; the client gets `400 Duplicate ID`
    /// - [`Error::ConnectionTimeout`](crate::Error::ConnectionTimeout) if the
    ///   upgrade does not complete within the handshake timeout
    /// - [`Error::WebSocket`](crate::Error::WebSocket) if the upgrade fails
    ///   (wrong path gets `404`) or a read fails
    /// - [`Error::UnexpectedFrameType`](crate::Error::UnexpectedFrameType) if
    ///   the client sends a non-binary frame
    pub async fn handle<S: Io>(&self, stream: S, peer: SocketAddr) -> Result<()> {
        let inner = &*self.inner;
        let id = ClientId::from_peer(peer);

        let mut claim: Option<Result<Reservation<'_>>> = None;
        let callback = |request: &Request, response: Response| -> StdResult<Response, ErrorResponse> {
            if request.uri().path() != inner.path {
                return Err(error_response(StatusCode::NOT_FOUND, "Not Found"));
            }
            let reserved = inner.registry.reserve(&id);
            let duplicate = reserved.is_err();
            claim = Some(reserved);
            if duplicate {
                return Err(error_response(StatusCode::BAD_REQUEST, "Duplicate ID"));
            }
            Ok(response)
        };

        let io: Box<dyn Io> = Box::new(stream);
        let limit = inner.handshake_timeout;
        let upgraded = timeout(
            limit,
            accept_hdr_async_with_config(io, callback, inner.websocket_config),
        )
        .await;

        let reservation = claim.transpose().inspect_err(|_| {
            warn!(client_id = %id, "Rejected duplicate client id");
        })?;
        let ws = upgraded
            .map_err(|_| Error::timed_out(limit))
            .and_then(|upgraded| upgraded.map_err(Error::from))
            .inspect_err(|e| {
                debug!(client_id = %id, error = %e, "WebSocket upgrade failed");
            })?;
        // The callback claims the id on every accepted upgrade
        let reservation = reservation.ok_or(Error::NotConnected)?;
        let connection = Arc::new(ServerConnection::from_stream(ws));

        if inner.shutdown.load(Ordering::SeqCst) {
            debug!(client_id = %id, "Upgrade completed during shutdown");
            connection.close().await;
            return Ok(());
        }

        info!(client_id = %id, "WebSocket connection accepted");

        if let Some(on_connect) = &inner.on_connect {
            on_connect(&id);
        }

        reservation.activate(Arc::clone(&connection));
        // Shutdown raises the flag before it walks the registry
        if inner.shutdown.load(Ordering::SeqCst) {
            connection.close().await;
        }

        let on_receive = inner.on_receive.as_ref();
        let result = connection
            .receive_loop(|data| {
                if let Some(on_receive) = on_receive {
                    on_receive(&id, data);
                }
            })
            .await;

        match &result {
            Ok(()) => debug!(client_id = %id, "Client closed connection"),
            Err(e) => warn!(client_id = %id, error = %e, "Read loop ended with error"),
        }

        drop(reservation);
        connection.close().await;
        result
    }
}

/// Builds an HTTP error response for a rejected upgrade.
fn error_response(status: StatusCode, body: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(body.to_owned()));
    *response.status_mut() = status;
    response
}

// ============================================================================
// Tests
// ============================================================================

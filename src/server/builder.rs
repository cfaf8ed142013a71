//! Builder pattern for server configuration.
//!
//! # Example
//!
//! ```no_run
//! use wsduplex::Server;
//!
//! # fn example() -> wsduplex::Result<()> {
//! let server = Server::builder()
//!     .path("/ws")
//!     .on_connect(|id| println!("{id} connected"))
//!     .on_receive(|id, data| println!("{id}: {} bytes", data.len()))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;

use super::core::Server;

// ============================================================================
// Constants
// ============================================================================

/// Mount path used when none is configured.
const DEFAULT_PATH: &str = "/";

/// Limit on transport setup plus the HTTP upgrade for one connection.
pub(super) const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Called once per accepted client, before it becomes addressable.
pub type OnConnect = Box<dyn Fn(&ClientId) + Send + Sync>;

/// Called for every binary payload read from a client, in arrival order.
///
/// Runs on that client's read loop; a slow hook delays its next read.
pub type OnReceive = Box<dyn Fn(&ClientId, Bytes) + Send + Sync>;

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for configuring a [`Server`] instance.
///
/// Use [`Server::builder()`] to create a new builder.
#[derive(Default)]
pub struct ServerBuilder {
    /// Upgrade path the handler accepts.
    path: Option<String>,
    /// Connect hook.
    on_connect: Option<OnConnect>,
    /// Receive hook.
    on_receive: Option<OnReceive>,
    /// Lower-layer WebSocket settings.
    websocket_config: Option<WebSocketConfig>,
    /// Handshake limit; `None` uses the default.
    handshake_timeout: Option<Duration>,
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("path", &self.path)
            .field("on_connect", &self.on_connect.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .field("websocket_config", &self.websocket_config)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}

impl ServerBuilder {
    /// Creates a builder with no hooks, mounted at `/`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upgrade path. Requests for other paths get `404`.
    #[inline]
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the connect hook.
    #[inline]
    #[must_use]
    pub fn on_connect<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientId) + Send + Sync + 'static,
    {
        self.on_connect = Some(Box::new(hook));
        self
    }

    /// Sets the receive hook.
    #[inline]
    #[must_use]
    pub fn on_receive<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClientId, Bytes) + Send + Sync + 'static,
    {
        self.on_receive = Some(Box::new(hook));
        self
    }

    /// Sets lower-layer WebSocket options.
    #[inline]
    #[must_use]
    pub fn websocket_config(mut self, config: WebSocketConfig) -> Self {
        self.websocket_config = Some(config);
        self
    }

    /// Sets how long a connection may take to complete its upgrade
    /// request. Defaults to 10s.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, limit: Duration) -> Self {
        self.handshake_timeout = Some(limit);
        self
    }

    /// Builds the server with an empty registry.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the path does not start with `/` or the
    /// handshake timeout is zero.
    pub fn build(self) -> Result<Server> {
        let path = self.validate_path()?;
        let handshake_timeout = self.handshake_timeout.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT);
        if handshake_timeout.is_zero() {
            return Err(Error::config("Handshake timeout must be non-zero"));
        }

        Ok(Server::from_parts(
            path,
            self.on_connect,
            self.on_receive,
            self.websocket_config,
            handshake_timeout,
        ))
    }

    /// Validates the path configuration.
    fn validate_path(&self) -> Result<String> {
        let path = self.path.clone().unwrap_or_else(|| DEFAULT_PATH.to_owned());
        if !path.starts_with('/') {
            return Err(Error::config(format!(
                "Server path must start with '/': {path:?}"
            )));
        }
        Ok(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

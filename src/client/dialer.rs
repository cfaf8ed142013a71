//! Transport factory for outbound connections.
//!
//! A [`Dialer`] turns a target URL into an established WebSocket channel.
//! It carries the TLS trust settings used for `wss://` targets.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use wsduplex::{Client, Dialer, TrustStore};
//!
//! # fn example() -> wsduplex::Result<()> {
//! let store = TrustStore::load("ca.pem")?;
//! let dialer = Dialer::new()
//!     .trust_store(&store)?
//!     .connect_timeout(Some(Duration::from_secs(5)));
//! let client = Client::with_dialer(dialer);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rustls::ClientConfig;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::tls::TrustStore;

// ============================================================================
// Constants
// ============================================================================

/// Default limit for TCP connect, TLS and WebSocket handshakes together.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Channel produced by a [`Dialer`].
pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Scheme
// ============================================================================

/// Transport scheme of a connect target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Unencrypted (`ws://`).
    Plain,
    /// TLS-encrypted (`wss://`).
    Secure,
}

impl Scheme {
    /// Returns the URL scheme string.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "ws",
            Self::Secure => "wss",
        }
    }

    /// Builds the target URL from `host:port` and path.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] if `host_port` is not a valid authority.
    pub fn url(self, host_port: &str, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}://{}", self.as_str(), host_port))?;
        url.set_path(path);
        Ok(url)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Dialer
// ============================================================================

/// Configurable transport factory.
///
/// The default dialer trusts the bundled webpki roots for `wss://`
/// targets, applies a 30s connect timeout and leaves Nagle enabled.
#[derive(Clone)]
pub struct Dialer {
    /// TLS client configuration. `None` uses the default roots.
    tls_config: Option<Arc<ClientConfig>>,
    /// Limit on the whole connect sequence.
    connect_timeout: Option<Duration>,
    /// Sets `TCP_NODELAY` on the socket.
    disable_nagle: bool,
    /// Lower-layer WebSocket settings.
    websocket_config: Option<WebSocketConfig>,
}

impl Default for Dialer {
    fn default() -> Self {
        Self {
            tls_config: None,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            disable_nagle: false,
            websocket_config: None,
        }
    }
}

impl fmt::Debug for Dialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialer")
            .field("custom_tls", &self.tls_config.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("disable_nagle", &self.disable_nagle)
            .field("websocket_config", &self.websocket_config)
            .finish()
    }
}

impl Dialer {
    /// Creates a dialer with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given TLS client configuration for `wss://` targets.
    #[inline]
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Trusts only the roots held by `store` for `wss://` targets.
    ///
    /// # Errors
    ///
    /// [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn trust_store(self, store: &TrustStore) -> Result<Self> {
        Ok(self.tls_config(store.client_config()?))
    }

    /// Sets the connect timeout. `None` waits indefinitely.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, limit: Option<Duration>) -> Self {
        self.connect_timeout = limit;
        self
    }

    /// Sets `TCP_NODELAY` on new connections.
    #[inline]
    #[must_use]
    pub fn disable_nagle(mut self, disable: bool) -> Self {
        self.disable_nagle = disable;
        self
    }

    /// Sets lower-layer WebSocket options (buffer and message size limits).
    #[inline]
    #[must_use]
    pub fn websocket_config(mut self, config: WebSocketConfig) -> Self {
        self.websocket_config = Some(config);
        self
    }

    /// Returns `true` if a custom TLS configuration is set.
    #[inline]
    #[must_use]
    pub fn has_custom_tls(&self) -> bool {
        self.tls_config.is_some()
    }

    /// Establishes a channel to `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the connect timeout elapses
    /// - [`Error::WebSocket`] if TCP, TLS or the handshake fails
    pub async fn dial(&self, url: &Url) -> Result<ClientStream> {
        let connector = self
            .tls_config
            .as_ref()
            .map(|config| Connector::Rustls(Arc::clone(config)));

        let handshake = connect_async_tls_with_config(
            url.as_str(),
            self.websocket_config,
            self.disable_nagle,
            connector,
        );

        let (stream, response) = match self.connect_timeout {
            Some(limit) => timeout(limit, handshake)
                .await
                .map_err(|_| Error::timed_out(limit))??,
            None => handshake.await?,
        };

        debug!(%url, status = %response.status(), "WebSocket handshake completed");
        Ok(stream)
    }
}

// ============================================================================
// Tests
// ============================================================================

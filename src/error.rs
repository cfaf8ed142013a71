//! Error types for wsduplex.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use wsduplex::{Client, Error, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     match client.write(b"ping".to_vec()).await {
//!         Err(Error::NotConnected) => client.connect("localhost:8080", "/").await,
//!         other => other,
//!     }
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Connection state | [`Error::AlreadyConnected`], [`Error::NotConnected`], [`Error::ConnectionTimeout`] |
//! | Framing | [`Error::UnexpectedFrameType`] |
//! | Registry | [`Error::InvalidId`], [`Error::DuplicateId`] |
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Certificates | [`Error::Certificate`], [`Error::Io`] |
//! | External | [`Error::WebSocket`], [`Error::Tls`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::ClientId;
use crate::transport::FrameKind;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Callers branch on the variant; the message text is for humans only.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection State Errors
    // ========================================================================
    /// Connect attempted while a channel is already held.
    #[error("Already connected")]
    AlreadyConnected,

    /// Send or read attempted with no channel present.
    #[error("No active connection")]
    NotConnected,

    /// Dial did not complete within the configured timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Framing Errors
    // ========================================================================
    /// A non-binary frame arrived where only binary payloads are valid.
    ///
    /// The read loop stops on this error without closing the connection.
    #[error("Expected binary frame, received {kind}")]
    UnexpectedFrameType {
        /// Kind of the offending frame.
        kind: FrameKind,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// No live connection is registered under this client id.
    #[error("Invalid client id: {id}")]
    InvalidId {
        /// The unknown client id.
        id: ClientId,
    },

    /// An upgrade request arrived from an id that is already registered.
    #[error("Duplicate client id: {id}")]
    DuplicateId {
        /// The id that is already taken.
        id: ClientId,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid builder configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Target URL could not be built from scheme, host and path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Certificate Errors
    // ========================================================================
    /// PEM block missing or malformed, or certificate DER rejected.
    #[error("Certificate parse error: {message}")]
    Certificate {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// WebSocket transport error (dial, read, write, upgrade).
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an unexpected frame type error.
    #[inline]
    pub fn unexpected_frame(kind: FrameKind) -> Self {
        Self::UnexpectedFrameType { kind }
    }

    /// Creates an invalid id error.
    #[inline]
    pub fn invalid_id(id: impl Into<ClientId>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    /// Creates a duplicate id error.
    #[inline]
    pub fn duplicate_id(id: impl Into<ClientId>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a connection timeout error from the limit that elapsed.
    ///
    /// Limits beyond `u64::MAX` milliseconds saturate.
    #[inline]
    pub fn timed_out(limit: Duration) -> Self {
        Self::connection_timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a certificate parse error.
    #[inline]
    pub fn certificate(message: impl Into<String>) -> Self {
        Self::Certificate {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConnected
                | Self::NotConnected
                | Self::ConnectionTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a server registry error.
    #[inline]
    #[must_use]
    pub fn is_registry_error(&self) -> bool {
        matches!(self, Self::InvalidId { .. } | Self::DuplicateId { .. })
    }

    /// Returns `true` if a certificate file was readable but unusable.
    #[inline]
    #[must_use]
    pub fn is_certificate_error(&self) -> bool {
        matches!(self, Self::Certificate { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

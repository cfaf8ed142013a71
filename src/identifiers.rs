//! Type-safe identifiers.
//!
//! [`ClientId`] keys the server registry. It is derived from the network
//! origin of a connection: the peer IP address with the port stripped.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

// ============================================================================
// ClientId
// ============================================================================

/// Identity of a client connected to a [`Server`](crate::Server).
///
/// Two connections from the same host map to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// Creates an id from an arbitrary string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the id from a peer socket address.
    ///
    /// Only the host portion is kept; IPv6 addresses print without brackets.
    #[inline]
    #[must_use]
    pub fn from_peer(addr: SocketAddr) -> Self {
        Self::from(addr.ip())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for ClientId {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ClientId> for ClientId {
    fn from(id: &ClientId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for ClientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Tests
// ============================================================================

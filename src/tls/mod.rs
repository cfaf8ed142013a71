//! TLS configuration.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `trust_store` | Client trust built from one self-signed certificate |
//! | `acceptor` | Server TLS acceptor from PEM certificate chain and key |

// ============================================================================
// Submodules
// ============================================================================

/// Server TLS acceptor.
pub mod acceptor;

/// Client trust store.
pub mod trust_store;

// ============================================================================
// Re-exports
// ============================================================================

pub use acceptor::{acceptor, server_config};
pub use trust_store::{TrustStore, self_signed_dialer};

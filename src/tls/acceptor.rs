//! Server-side TLS from PEM files.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::result::Result as StdResult;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::crypto::ring;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Public API
// ============================================================================

/// Builds a TLS acceptor from a PEM certificate chain and a PEM private key.
///
/// The key may be PKCS#8, PKCS#1 (RSA) or SEC1 (EC).
///
/// # Errors
///
/// - [`Error::Io`] if either file cannot be read
/// - [`Error::Certificate`] if a PEM block is missing or malformed
/// - [`Error::Tls`] if rustls rejects the certificate or key
pub fn acceptor(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<TlsAcceptor> {
    let cert_pem = fs::read(cert_path.as_ref())?;
    let key_pem = fs::read(key_path.as_ref())?;
    let config = server_config(&cert_pem, &key_pem)?;

    debug!(cert = %cert_path.as_ref().display(), "TLS acceptor ready");
    Ok(TlsAcceptor::from(config))
}

/// Builds a TLS server configuration from in-memory PEM data.
///
/// # Errors
///
/// Same as [`acceptor`], without [`Error::Io`].
pub fn server_config(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>> {
    let chain = CertificateDer::pem_slice_iter(cert_pem)
        .collect::<StdResult<Vec<_>, _>>()
        .map_err(|e| Error::certificate(format!("malformed certificate chain: {e}")))?;
    if chain.is_empty() {
        return Err(Error::certificate("no certificate PEM block"));
    }

    let key = PrivateKeyDer::from_pem_slice(key_pem)
        .map_err(|e| Error::certificate(format!("no private key PEM block: {e}")))?;

    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;

    Ok(Arc::new(config))
}

// ============================================================================
// Tests
// ============================================================================

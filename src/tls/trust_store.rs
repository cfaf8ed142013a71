//! Self-signed certificate trust.
//!
//! Builds a root set holding exactly one certificate read from a PEM file.
//! The system and webpki roots are not included, so a dialer built from it
//! trusts that certificate and nothing else.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::ring;
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use crate::client::Dialer;
use crate::error::{Error, Result};

// ============================================================================
// TrustStore
// ============================================================================

/// Immutable set of trusted roots built from one PEM certificate.
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: Arc<RootCertStore>,
}

impl TrustStore {
    /// Reads a PEM file and trusts the certificate it contains.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the file cannot be read
    /// - [`Error::Certificate`] if no certificate block is found or the
    ///   certificate data is malformed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let pem = fs::read(path)?;
        let store = Self::from_pem(&pem)?;
        debug!(path = %path.display(), "Trust store loaded");
        Ok(store)
    }

    /// Trusts the first certificate block in `pem`.
    ///
    /// # Errors
    ///
    /// [`Error::Certificate`] if no certificate block is found or the
    /// certificate data is malformed.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let cert = CertificateDer::from_pem_slice(pem)
            .map_err(|e| Error::certificate(format!("no certificate PEM block: {e}")))?;

        let mut roots = RootCertStore::empty();
        roots
            .add(cert)
            .map_err(|e| Error::certificate(format!("malformed certificate: {e}")))?;

        Ok(Self {
            roots: Arc::new(roots),
        })
    }

    /// Returns the number of trusted roots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if no root is trusted.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Returns the root set.
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &RootCertStore {
        &self.roots
    }

    /// Builds a TLS client configuration trusting only these roots.
    ///
    /// # Errors
    ///
    /// [`Error::Tls`] if the crypto provider rejects the protocol versions.
    pub fn client_config(&self) -> Result<Arc<ClientConfig>> {
        let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(Arc::clone(&self.roots))
            .with_no_client_auth();
        Ok(Arc::new(config))
    }

    /// Returns a default dialer that trusts only these roots.
    ///
    /// # Errors
    ///
    /// [`Error::Tls`] if the TLS configuration cannot be built.
    pub fn dialer(&self) -> Result<Dialer> {
        Dialer::new().trust_store(self)
    }
}

/// Loads `cert_path` and returns a dialer that trusts only that certificate.
///
/// # Errors
///
/// Same as [`TrustStore::load`], plus [`Error::Tls`].
pub fn self_signed_dialer(cert_path: impl AsRef<Path>) -> Result<Dialer> {
    TrustStore::load(cert_path)?.dialer()
}

// ============================================================================
// Tests
// ============================================================================

//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Fixture certificate paths

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Self-signed certificate for `localhost`.
pub const CERT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/server.pem");

/// Private key matching [`CERT_PATH`].
pub const KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/server.key");

/// Plain listener port.
pub const PLAIN_PORT: u16 = 9000;

/// TLS listener port.
pub const TLS_PORT: u16 = 9443;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub tls: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            tls: args.iter().any(|a| a == "--tls"),
        }
    }

    /// Port matching the selected transport.
    pub fn port(&self) -> u16 {
        if self.tls { TLS_PORT } else { PLAIN_PORT }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug { "wsduplex=debug" } else { "wsduplex=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

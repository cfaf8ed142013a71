//! Single-connection WebSocket client.
//!
//! # Connection Lifecycle
//!
//! 1. `Client::connect` / `Client::connect_secure` - Dial `ws://` or `wss://`
//! 2. `Client::read_loop` - One task reads binary frames until close
//! 3. `Client::write` - Any task sends binary frames
//! 4. `Client::close` - Send close notice and release; reconnect allowed
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | The [`Client`] itself |
//! | `dialer` | Transport factory and TLS trust settings |

// ============================================================================
// Submodules
// ============================================================================

/// The client.
pub mod core;

/// Transport factory.
pub mod dialer;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::Client;
pub use dialer::{ClientStream, Dialer, Scheme};

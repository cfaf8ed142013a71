//! Multi-connection WebSocket server.
//!
//! Every accepted client is keyed by a [`ClientId`](crate::ClientId) derived
//! from its peer address. The server pushes binary frames to a client by id
//! and hands inbound frames to a receive hook.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Hooks, mount path and WebSocket options |
//! | `core` | [`Server`], [`Handler`] and accept loops |
//! | `registry` | Id to connection map with atomic reservation |

// ============================================================================
// Submodules
// ============================================================================

/// Server configuration.
pub mod builder;

/// The server and its request handler.
pub mod core;

/// Client registry.
mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Handler, Server};
pub use builder::{OnConnect, OnReceive, ServerBuilder};

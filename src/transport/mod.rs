//! Guarded WebSocket channel.
//!
//! This module wraps one established WebSocket channel so that many tasks
//! can write to it while one task reads from it.
//!
//! # Architecture
//!
//! ```text
//!   send() ──► [writer lock] ──► SplitSink ──┐
//!   send() ──►      ...                      │
//!                                            ├──► WebSocketStream<S> ◄──► peer
//!   receive_loop(cb) ◄── [reader lock] ◄── SplitStream
//!        │
//!        └─► cb(payload)   binary frames only, in arrival order
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Inbound message classification |
//! | `guard` | Read/write-locked channel wrapper |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound message classification.
pub mod frame;

/// Read/write-locked channel wrapper.
pub mod guard;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::FrameKind;
pub use guard::{ConnectionGuard, Io};

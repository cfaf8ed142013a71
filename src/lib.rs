//! Full-duplex binary messaging over WebSocket.
//!
//! One guarded channel type carries binary frames both ways. A [`Client`]
//! holds one channel to a server; a [`Server`] holds one channel per
//! client, keyed by [`ClientId`].
//!
//! # Architecture
//!
//! - Writes are serialized per channel; any number of tasks may call
//!   `write`/`send` concurrently.
//! - Reads are serialized per channel; one task drives the read loop and
//!   receives payloads through a callback, in arrival order.
//! - A write never waits for a pending read, and the reverse.
//! - Text frames are rejected; ping/pong are answered by the transport.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio::net::TcpListener;
//! use wsduplex::{Client, Result, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::builder()
//!         .on_receive(|id, data| println!("{id} sent {} bytes", data.len()))
//!         .build()?;
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     tokio::spawn({
//!         let server = server.clone();
//!         async move { server.serve(listener).await }
//!     });
//!
//!     let client = Arc::new(Client::new());
//!     client.connect("127.0.0.1:8080", "/").await?;
//!
//!     let reader = Arc::clone(&client);
//!     tokio::spawn(async move { reader.read_loop(|data| println!("{data:?}")).await });
//!
//!     client.write(b"hello".to_vec()).await?;
//!     server.send("127.0.0.1", b"welcome".to_vec()).await?;
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Single-connection client and its dialer |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Client identity |
//! | [`server`] | Multi-connection server, handler and registry |
//! | [`tls`] | Trust store and server TLS acceptor |
//! | [`transport`] | Guarded channel shared by both sides |

// ============================================================================
// Modules
// ============================================================================

/// Single-connection WebSocket client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Client identity.
pub mod identifiers;

/// Multi-connection WebSocket server.
///
/// Use [`Server::builder()`] to configure hooks and the mount path.
pub mod server;

/// TLS trust and acceptor configuration.
pub mod tls;

/// Guarded WebSocket channel.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientStream, Dialer, Scheme};

// Server types
pub use server::{Handler, OnConnect, OnReceive, Server, ServerBuilder};

// TLS types
pub use tls::{TrustStore, self_signed_dialer};

// Transport types
pub use transport::{ConnectionGuard, FrameKind, Io};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::ClientId;

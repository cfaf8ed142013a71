//! Client registry.
//!
//! Maps each [`ClientId`] to its live connection. One coarse lock covers
//! the whole map and is held only for lookup, insert and remove, never
//! across a read or write on a connection.
//!
//! # Slot Lifecycle
//!
//! ```text
//!  (absent) ──reserve──► Reserved ──activate──► Connected
//!      ▲                    │                      │
//!      └────── drop(Reservation) ◄─────────────────┘
//! ```
//!
//! The duplicate check and the `Reserved` insert happen under one lock
//! acquisition, so two upgrades for the same id can never both proceed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::transport::{ConnectionGuard, Io};

// ============================================================================
// Types
// ============================================================================

/// Connection held by the server for one client.
pub(crate) type ServerConnection = ConnectionGuard<Box<dyn Io>>;

/// Registry entry.
enum Slot {
    /// Upgrade in progress; not addressable yet.
    Reserved,
    /// Upgrade complete; addressable by `Server::send`.
    Connected(Arc<ServerConnection>),
}

// ============================================================================
// Registry
// ============================================================================

/// Client id to connection map owned by one server.
#[derive(Default)]
pub(crate) struct Registry {
    slots: Mutex<FxHashMap<ClientId, Slot>>,
}

impl Registry {
    /// Claims `id` for an upgrade in progress.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateId`] if `id` is reserved or connected.
    pub(crate) fn reserve(&self, id: &ClientId) -> Result<Reservation<'_>> {
        let mut slots = self.slots.lock();
        if slots.contains_key(id) {
            return Err(Error::duplicate_id(id));
        }
        slots.insert(id.clone(), Slot::Reserved);
        trace!(client_id = %id, "Client id reserved");

        Ok(Reservation {
            registry: self,
            id: id.clone(),
        })
    }

    /// Returns the live connection for `id`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidId`] if `id` is absent or still upgrading.
    pub(crate) fn connection(&self, id: &str) -> Result<Arc<ServerConnection>> {
        match self.slots.lock().get(id) {
            Some(Slot::Connected(connection)) => Ok(Arc::clone(connection)),
            _ => Err(Error::invalid_id(id)),
        }
    }

    /// Returns the number of connected clients.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Connected(_)))
            .count()
    }

    /// Returns the ids of connected clients, sorted.
    pub(crate) fn ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<_> = self
            .slots
            .lock()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Connected(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Returns every live connection.
    pub(crate) fn connections(&self) -> Vec<Arc<ServerConnection>> {
        self.slots
            .lock()
            .values()
            .filter_map(|slot| match slot {
                Slot::Connected(connection) => Some(Arc::clone(connection)),
                Slot::Reserved => None,
            })
            .collect()
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Exclusive claim on one registry id.
///
/// Dropping it removes the entry, whether the upgrade failed, the read
/// loop ended, or the handling task was cancelled.
pub(crate) struct Reservation<'a> {
    registry: &'a Registry,
    id: ClientId,
}

impl Reservation<'_> {
    /// Publishes the connection under the reserved id.
    pub(crate) fn activate(&self, connection: Arc<ServerConnection>) {
        self.registry
            .slots
            .lock()
            .insert(self.id.clone(), Slot::Connected(connection));
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.registry.slots.lock().remove(&self.id);
        trace!(client_id = %self.id, "Client id released");
    }
}

// ============================================================================
// Tests
// ============================================================================

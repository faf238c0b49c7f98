//! Client registry: who is connected and under which display name.
//!
//! All operations take the same guard for their whole critical section and
//! only touch the in-memory map. Nothing here awaits network I/O, so the
//! guard is never held while a peer is being written to.

use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionHandle, ConnectionId};
use crate::protocol::DEFAULT_NAME;

struct Entry {
    handle: ConnectionHandle,
    name: String,
}

/// Shared map from connection to display name
#[derive(Default)]
pub struct ClientRegistry {
    // Handle and name live in one entry so the connected set and the name
    // map cannot diverge.
    clients: Mutex<BTreeMap<ConnectionId, Entry>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection under the default name. Returns the new client count.
    pub async fn register(&self, handle: ConnectionHandle) -> usize {
        let id = handle.id();
        let mut clients = self.clients.lock().await;
        let previous = clients.insert(
            id,
            Entry {
                handle,
                name: DEFAULT_NAME.to_string(),
            },
        );
        if previous.is_some() {
            tracing::warn!(%id, "Connection registered twice");
        }
        let total = clients.len();
        tracing::info!(%id, total, "Client connected");
        total
    }

    /// Set the display name of a registered connection.
    ///
    /// Returns false (and changes nothing) when the connection is not
    /// registered, e.g. when it was already evicted or drained by shutdown.
    pub async fn rename(&self, id: ConnectionId, name: &str) -> bool {
        let mut clients = self.clients.lock().await;
        match clients.get_mut(&id) {
            Some(entry) => {
                entry.name = name.to_string();
                true
            }
            None => {
                tracing::debug!(%id, "Rename for unknown connection ignored");
                false
            }
        }
    }

    /// Remove a connection and return its last known name
    pub async fn unregister(&self, id: ConnectionId) -> String {
        let mut clients = self.clients.lock().await;
        let name = clients
            .remove(&id)
            .map(|entry| entry.name)
            .unwrap_or_else(|| DEFAULT_NAME.to_string());
        tracing::info!(%id, total = clients.len(), "Client disconnected");
        name
    }

    /// Current display name of a connection (default if unknown)
    pub async fn name_of(&self, id: ConnectionId) -> String {
        self.clients
            .lock()
            .await
            .get(&id)
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| DEFAULT_NAME.to_string())
    }

    /// Point-in-time copy of all registered connections, in id order
    pub async fn snapshot(&self) -> Vec<(ConnectionHandle, String)> {
        self.clients
            .lock()
            .await
            .values()
            .map(|entry| (entry.handle.clone(), entry.name.clone()))
            .collect()
    }

    /// Remove every listed connection that is still registered.
    /// Returns how many were actually removed.
    pub async fn evict(&self, ids: &[ConnectionId]) -> usize {
        let mut clients = self.clients.lock().await;
        let removed = ids
            .iter()
            .filter(|id| clients.remove(*id).is_some())
            .count();
        if removed > 0 {
            tracing::info!(removed, total = clients.len(), "Evicted dead clients");
        }
        removed
    }

    /// Take every handle out of the registry, leaving it empty
    pub async fn drain(&self) -> Vec<ConnectionHandle> {
        let mut clients = self.clients.lock().await;
        std::mem::take(&mut *clients)
            .into_values()
            .map(|entry| entry.handle)
            .collect()
    }

    pub async fn names(&self) -> Vec<String> {
        self.clients
            .lock()
            .await
            .values()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

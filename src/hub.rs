//! Broadcast engine and server-wide shutdown.
//!
//! A [`Hub`] is constructed once per running server and shared by every
//! session through an `Arc`. Fan-out works on a registry snapshot: the
//! registry guard is released before the first frame is written, and peers
//! whose send failed (or timed out) are evicted afterwards.

use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::connection::{Connection, ConnectionHandle, ConnectionId};
use crate::error::ConnectionError;
use crate::protocol::CloseReason;
use crate::registry::ClientRegistry;

/// Outcome of one broadcast call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub evicted: usize,
}

/// Outcome of closing every client on shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub closed: usize,
    pub failed: usize,
}

pub struct Hub {
    registry: ClientRegistry,
    config: HubConfig,
    shutdown: CancellationToken,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: ClientRegistry::new(),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Deliver `text` to every registered client
    pub async fn broadcast(&self, text: &str) -> BroadcastReport {
        self.fan_out(text, None).await
    }

    /// Deliver `text` to every registered client except `sender`
    pub async fn broadcast_from(&self, sender: ConnectionId, text: &str) -> BroadcastReport {
        self.fan_out(text, Some(sender)).await
    }

    async fn fan_out(&self, text: &str, exclude: Option<ConnectionId>) -> BroadcastReport {
        let recipients: Vec<ConnectionHandle> = self
            .registry
            .snapshot()
            .await
            .into_iter()
            .map(|(handle, _)| handle)
            .filter(|handle| Some(handle.id()) != exclude)
            .collect();

        if recipients.is_empty() {
            return BroadcastReport::default();
        }

        let send_timeout = self.config.send_timeout;
        let results = join_all(recipients.iter().map(|handle| async move {
            let result = match tokio::time::timeout(send_timeout, handle.send(text)).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::Timeout(send_timeout)),
            };
            (handle.id(), result)
        }))
        .await;

        let failed: Vec<ConnectionId> = results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::debug!(%id, error = %e, "Delivery failed, evicting client");
                    Some(id)
                }
            })
            .collect();

        let evicted = if failed.is_empty() {
            0
        } else {
            self.registry.evict(&failed).await
        };

        BroadcastReport {
            attempted: recipients.len(),
            delivered: recipients.len() - failed.len(),
            evicted,
        }
    }

    /// Close every client and empty the registry.
    ///
    /// Each close is attempted independently and bounded by the configured
    /// close timeout. Sessions still running observe [`Hub::closed`] and
    /// wind down on their own. Calling this again only closes clients that
    /// registered in between.
    pub async fn shutdown(&self) -> ShutdownReport {
        let handles = self.registry.drain().await;
        tracing::info!(clients = handles.len(), "Closing all client connections");

        let close_timeout = self.config.close_timeout;
        let results = join_all(handles.iter().map(|handle| async move {
            let reason = CloseReason::server_shutdown();
            match tokio::time::timeout(close_timeout, handle.close(reason)).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::Timeout(close_timeout)),
            }
        }))
        .await;

        self.shutdown.cancel();

        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed > 0 {
            tracing::warn!(failed, "Some clients could not be closed cleanly");
        }

        ShutdownReport {
            closed: results.len() - failed,
            failed,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once [`Hub::shutdown`] has closed all clients
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

/// Shared hub handle passed to every session and route
pub type SharedHub = Arc<Hub>;

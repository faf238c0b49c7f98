//! HTTP/WebSocket server wiring.

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::ServerConfig;
use crate::error::{HubError, HubResult};
use crate::hub::{Hub, SharedHub, ShutdownReport};
use crate::ws;

/// Build the application router around a hub
pub fn router(hub: SharedHub) -> Router {
    Router::new()
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/api/clients", get(api::list_clients))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// A bound, not yet running, broadcast server
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    hub: SharedHub,
}

impl Server {
    /// Resolve and bind the listen address. Failing here is fatal for `start`.
    pub async fn bind(config: &ServerConfig) -> HubResult<Self> {
        let address = config.bind_address();
        let addr = tokio::net::lookup_host(&address)
            .await
            .map_err(|_| HubError::InvalidAddress(address.clone()))?
            .next()
            .ok_or_else(|| HubError::InvalidAddress(address.clone()))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HubError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            hub: Arc::new(Hub::new(config.hub.clone())),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn hub(&self) -> SharedHub {
        self.hub.clone()
    }

    /// Serve until `shutdown` resolves, then close every client
    pub async fn run<F>(self, shutdown: F) -> HubResult<ShutdownReport>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Listening on ws://{}", self.local_addr);

        let app = router(self.hub.clone());
        axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(HubError::Serve)?;

        tracing::info!("Stopped accepting connections");
        let report = self.hub.shutdown().await;
        tracing::info!(
            closed = report.closed,
            failed = report.failed,
            "Server shut down"
        );
        Ok(report)
    }
}

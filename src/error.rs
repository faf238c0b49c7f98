use std::net::SocketAddr;
use std::time::Duration;

/// Result type for hub-level operations
pub type HubResult<T> = Result<T, HubError>;

/// Errors surfaced to the operator (startup, serving, client connect)
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid listen address {0:?}")]
    InvalidAddress(String),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors on a single peer's channel.
///
/// These never leave the hub: a failed send evicts the peer, a failed
/// receive ends that peer's session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

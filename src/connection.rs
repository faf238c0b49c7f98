//! Connection handles.
//!
//! A handle is the registry's view of one open duplex text channel. The
//! transport layer owns the socket; the registry only keeps an `Arc` to the
//! send/close capability so it can fan messages out.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

use crate::error::ConnectionError;
use crate::protocol::CloseReason;

/// Unique identity of a connection, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Send side of a single peer channel
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Send one text frame. Fails once the channel is closed.
    async fn send(&self, text: &str) -> Result<(), ConnectionError>;

    /// Close the channel with a code and reason
    async fn close(&self, reason: CloseReason) -> Result<(), ConnectionError>;
}

pub type ConnectionHandle = Arc<dyn Connection>;

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory connection that records everything sent to it
    #[derive(Default)]
    pub struct MockConnection {
        id: ConnectionId,
        sent: Mutex<Vec<String>>,
        closes: Mutex<Vec<CloseReason>>,
        fail_send: AtomicBool,
        fail_close: AtomicBool,
        stall_send: AtomicBool,
    }

    impl MockConnection {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// A peer whose channel is already broken
        pub fn broken() -> Arc<Self> {
            let conn = Self::new();
            conn.fail_send.store(true, Ordering::SeqCst);
            conn.fail_close.store(true, Ordering::SeqCst);
            conn
        }

        /// A peer that never completes a send
        pub fn stalled() -> Arc<Self> {
            let conn = Self::new();
            conn.stall_send.store(true, Ordering::SeqCst);
            conn
        }

        pub fn handle(self: &Arc<Self>) -> ConnectionHandle {
            self.clone()
        }

        pub fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        pub fn closes(&self) -> Vec<CloseReason> {
            self.closes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connection for MockConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        async fn send(&self, text: &str) -> Result<(), ConnectionError> {
            if self.stall_send.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(ConnectionError::Closed);
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn close(&self, reason: CloseReason) -> Result<(), ConnectionError> {
            self.closes.lock().unwrap().push(reason);
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(ConnectionError::Closed);
            }
            Ok(())
        }
    }
}

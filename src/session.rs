//! Per-connection session loop.
//!
//! ```text
//! Connecting --register--> Active --end of stream / read error / shutdown--> Closing --> Closed
//!      \__________________ hub already shutting down ________________________/
//! ```
//!
//! Whatever path a session takes, `Closing` unregisters the connection and
//! broadcasts exactly one departure notice.

use futures::{Stream, StreamExt};
use std::sync::Arc;

use crate::connection::{Connection, ConnectionHandle, ConnectionId};
use crate::error::ConnectionError;
use crate::hub::Hub;
use crate::protocol::{self, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

/// Why a session left the `Active` state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// The peer closed the channel
    RemoteClosed,
    /// Reading from the channel failed
    ReadError,
    /// The server is shutting down
    Shutdown,
}

/// What a finished session reports back to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: ConnectionId,
    /// Name the departure notice was sent under
    pub name: String,
    /// Inbound frames processed while active
    pub frames: usize,
    pub cause: CloseCause,
}

pub struct Session {
    hub: Arc<Hub>,
    handle: ConnectionHandle,
    state: SessionState,
    frames: usize,
}

impl Session {
    pub fn new(hub: Arc<Hub>, handle: ConnectionHandle) -> Self {
        Self {
            hub,
            handle,
            state: SessionState::Connecting,
            frames: 0,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(id = %self.id(), from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }

    /// Drive the session until its inbound stream ends, fails, or the hub shuts down
    pub async fn run<S>(mut self, frames: S) -> SessionSummary
    where
        S: Stream<Item = Result<String, ConnectionError>>,
    {
        let cause = if self.hub.is_shutting_down() {
            CloseCause::Shutdown
        } else {
            self.hub.registry().register(self.handle.clone()).await;
            self.transition(SessionState::Active);
            self.receive_loop(frames).await
        };

        self.transition(SessionState::Closing);
        let name = self.hub.registry().unregister(self.id()).await;
        self.hub.broadcast(&protocol::left_notice(&name)).await;
        self.transition(SessionState::Closed);

        tracing::info!(
            id = %self.id(),
            name = %name,
            frames = self.frames,
            cause = ?cause,
            "Session ended"
        );

        SessionSummary {
            id: self.id(),
            name,
            frames: self.frames,
            cause,
        }
    }

    async fn receive_loop<S>(&mut self, frames: S) -> CloseCause
    where
        S: Stream<Item = Result<String, ConnectionError>>,
    {
        let mut frames = std::pin::pin!(frames);
        let hub = self.hub.clone();

        loop {
            tokio::select! {
                _ = hub.closed() => return CloseCause::Shutdown,
                next = frames.next() => match next {
                    Some(Ok(text)) => {
                        self.frames += 1;
                        self.handle_frame(&text).await;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(id = %self.id(), error = %e, "Read failed, closing session");
                        return CloseCause::ReadError;
                    }
                    None => return CloseCause::RemoteClosed,
                },
            }
        }
    }

    async fn handle_frame(&self, text: &str) {
        let id = self.id();
        match Frame::parse(text) {
            Frame::Name(name) => {
                // A repeated naming frame is treated as a rename plus another join notice
                self.hub.registry().rename(id, &name).await;
                tracing::info!(%id, name = %name, "Client registered name");
                self.hub
                    .broadcast_from(id, &protocol::joined_notice(&name))
                    .await;
            }
            Frame::Chat(body) => {
                let name = self.hub.registry().name_of(id).await;
                let line = protocol::chat_line(&name, body);
                tracing::debug!(%id, "Received: {}", line);
                self.hub.broadcast_from(id, &line).await;
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Closed && self.state != SessionState::Connecting {
            tracing::warn!(id = %self.id(), state = ?self.state, "Session dropped before closing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HubConfig;
    use crate::connection::mock::MockConnection;
    use futures::channel::mpsc;
    use futures::stream;
    use std::time::Duration;

    fn hub() -> Arc<Hub> {
        Arc::new(Hub::new(HubConfig {
            send_timeout: Duration::from_millis(50),
            close_timeout: Duration::from_millis(50),
        }))
    }

    fn frames(items: &[&str]) -> impl Stream<Item = Result<String, ConnectionError>> {
        stream::iter(
            items
                .iter()
                .map(|s| Ok(s.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    async fn observer(hub: &Arc<Hub>) -> Arc<MockConnection> {
        let conn = MockConnection::new();
        hub.registry().register(conn.handle()).await;
        conn
    }

    #[tokio::test]
    async fn test_named_client_chat_and_departure() {
        let hub = hub();
        let other = observer(&hub).await;
        let alice = MockConnection::new();

        let summary = Session::new(hub.clone(), alice.handle())
            .run(frames(&["__name__:alice", "hello"]))
            .await;

        assert_eq!(
            other.sent(),
            vec![
                "alice joined the chat".to_string(),
                "alice: hello".to_string(),
                "alice left the chat".to_string(),
            ]
        );
        assert!(alice.sent().is_empty());
        assert_eq!(summary.name, "alice");
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.cause, CloseCause::RemoteClosed);
        assert_eq!(hub.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_unnamed_client_is_anonymous() {
        let hub = hub();
        let c = observer(&hub).await;
        let b = MockConnection::new();

        Session::new(hub.clone(), b.handle())
            .run(frames(&["hi"]))
            .await;

        assert_eq!(
            c.sent(),
            vec![
                "anonymous: hi".to_string(),
                "anonymous left the chat".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_name_frames_fall_back_to_default() {
        for frame in ["__name__:", "__name__:   "] {
            let hub = hub();
            let other = observer(&hub).await;
            let conn = MockConnection::new();

            let summary = Session::new(hub.clone(), conn.handle())
                .run(frames(&[frame, "x"]))
                .await;

            assert_eq!(summary.name, "anonymous");
            assert_eq!(other.sent()[0], "anonymous joined the chat");
            assert_eq!(other.sent()[1], "anonymous: x");
        }
    }

    #[tokio::test]
    async fn test_repeated_name_frame_renames_and_rejoins() {
        let hub = hub();
        let other = observer(&hub).await;
        let conn = MockConnection::new();

        let summary = Session::new(hub.clone(), conn.handle())
            .run(frames(&["__name__:alice", "__name__:alicia", "hey"]))
            .await;

        assert_eq!(
            other.sent(),
            vec![
                "alice joined the chat".to_string(),
                "alicia joined the chat".to_string(),
                "alicia: hey".to_string(),
                "alicia left the chat".to_string(),
            ]
        );
        assert_eq!(summary.name, "alicia");
    }

    #[tokio::test]
    async fn test_read_error_ends_session_once() {
        let hub = hub();
        let other = observer(&hub).await;
        let conn = MockConnection::new();

        let inbound = stream::iter(vec![
            Ok("__name__:dave".to_string()),
            Err(ConnectionError::Receive("reset".into())),
            Ok("never processed".to_string()),
        ]);
        let summary = Session::new(hub.clone(), conn.handle()).run(inbound).await;

        assert_eq!(summary.cause, CloseCause::ReadError);
        assert_eq!(summary.frames, 1);
        let departures = other
            .sent()
            .iter()
            .filter(|line| line.ends_with("left the chat"))
            .count();
        assert_eq!(departures, 1);
        assert!(!other.sent().contains(&"dave: never processed".to_string()));
    }

    #[tokio::test]
    async fn test_session_registers_while_active() {
        let hub = hub();
        let conn = MockConnection::new();
        let (tx, rx) = mpsc::unbounded();

        let task = tokio::spawn(Session::new(hub.clone(), conn.handle()).run(rx));

        tx.unbounded_send(Ok("__name__:erin".to_string())).unwrap();
        // Wait until the name lands in the registry
        for _ in 0..100 {
            if hub.registry().names().await == vec!["erin".to_string()] {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(hub.registry().name_of(conn.id()).await, "erin");

        drop(tx);
        let summary = task.await.unwrap();
        assert_eq!(summary.name, "erin");
        assert!(hub.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_ends_active_session() {
        let hub = hub();
        let conn = MockConnection::new();
        let (tx, rx) = mpsc::unbounded::<Result<String, ConnectionError>>();

        let task = tokio::spawn(Session::new(hub.clone(), conn.handle()).run(rx));
        while hub.registry().is_empty().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        hub.shutdown().await;
        let summary = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("session should stop on shutdown")
            .unwrap();

        assert_eq!(summary.cause, CloseCause::Shutdown);
        assert_eq!(conn.closes(), vec![protocol::CloseReason::server_shutdown()]);
        drop(tx);
    }

    #[tokio::test]
    async fn test_session_after_shutdown_departs_without_registering() {
        let hub = hub();
        hub.shutdown().await;
        let late = observer(&hub).await;
        let conn = MockConnection::new();

        let summary = Session::new(hub.clone(), conn.handle())
            .run(frames(&["__name__:zed", "ignored"]))
            .await;

        assert_eq!(summary.cause, CloseCause::Shutdown);
        assert_eq!(summary.frames, 0);
        assert_eq!(summary.name, "anonymous");
        assert_eq!(late.sent(), vec!["anonymous left the chat".to_string()]);
    }
}

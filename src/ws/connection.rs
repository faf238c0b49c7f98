//! WebSocket-backed connection handle

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::{sink::SinkExt, stream::SplitSink};
use tokio::sync::Mutex;

use crate::connection::{Connection, ConnectionId};
use crate::error::ConnectionError;
use crate::protocol::CloseReason;

/// Send half of an accepted WebSocket.
///
/// The receive half stays with the session; the sink sits behind its own
/// lock so concurrent broadcasts to the same peer are written one at a time.
pub struct WsConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsConnection {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, text: &str) -> Result<(), ConnectionError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ConnectionError::Send(e.to_string()))
    }

    async fn close(&self, reason: CloseReason) -> Result<(), ConnectionError> {
        let frame = CloseFrame {
            code: reason.code,
            reason: reason.reason.into(),
        };
        self.sink
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| ConnectionError::Send(e.to_string()))
    }
}

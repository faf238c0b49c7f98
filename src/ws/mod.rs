mod connection;

pub use connection::WsConnection;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
};
use futures::{future, stream::StreamExt, Stream};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::ConnectionError;
use crate::hub::SharedHub;
use crate::session::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(hub): State<SharedHub>,
) -> impl IntoResponse {
    tracing::debug!(%peer, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, peer, hub))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, peer: SocketAddr, hub: SharedHub) {
    let (sender, receiver) = socket.split();
    let conn = Arc::new(WsConnection::new(sender));

    tracing::info!(%peer, id = %conn.id(), "WebSocket connected");

    let summary = Session::new(hub, conn).run(text_frames(receiver)).await;

    tracing::info!(
        %peer,
        name = %summary.name,
        cause = ?summary.cause,
        "WebSocket connection closed"
    );
}

/// Inbound text frames of a socket.
///
/// Ends at the peer's Close frame or when the stream ends. Binary, ping and
/// pong frames carry no chat text and are skipped; axum answers pings itself.
pub fn text_frames<S>(receiver: S) -> impl Stream<Item = Result<String, ConnectionError>>
where
    S: Stream<Item = Result<Message, axum::Error>>,
{
    receiver
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                Ok(_) => None,
                Err(e) => Some(Err(ConnectionError::Receive(e.to_string()))),
            })
        })
}

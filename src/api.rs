//! HTTP endpoints for operators.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::hub::SharedHub;

/// Who is connected right now
#[derive(Debug, Clone, Serialize)]
pub struct ClientsResponse {
    pub count: usize,
    pub names: Vec<String>,
    pub shutting_down: bool,
}

/// List connected clients.
///
/// GET /api/clients
pub async fn list_clients(State(hub): State<SharedHub>) -> Json<ClientsResponse> {
    let names = hub.registry().names().await;
    Json(ClientsResponse {
        count: names.len(),
        names,
        shutting_down: hub.is_shutting_down(),
    })
}

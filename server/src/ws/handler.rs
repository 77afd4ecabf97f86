use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::Response,
};
use std::net::SocketAddr;

use crate::session::ConnectionId;
use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. No credentials: a connection becomes a participant by
/// sending a `join` event after the upgrade.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    let connection_id = ConnectionId::new();
    tracing::debug!(
        connection_id = %connection_id,
        remote_addr = %remote_addr,
        "WebSocket upgrade requested"
    );

    ws.on_upgrade(move |socket| actor::run_connection(socket, state, connection_id, remote_addr))
}

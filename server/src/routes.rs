use axum::{routing::get, Router};

use crate::chat::presence;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the WebSocket
/// handler reads the peer address.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler::ws_upgrade))
        .route("/api/presence", get(presence::get_presence))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

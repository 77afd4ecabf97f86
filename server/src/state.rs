use std::sync::Arc;

use crate::config::Limits;
use crate::session::SessionManager;
use crate::ws::{new_connection_registry, ConnectionRegistry};

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Joined connections and claimed names (single lock)
    pub sessions: Arc<SessionManager>,
    /// Outbound channel of every live WebSocket connection, joined or not
    pub connections: ConnectionRegistry,
    /// Per-connection limits from config
    pub limits: Limits,
}

impl AppState {
    pub fn new(limits: Limits) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(&limits)),
            connections: new_connection_registry(),
            limits,
        }
    }
}

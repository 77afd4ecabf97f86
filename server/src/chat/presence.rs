//! Presence payloads and the read-only presence endpoint.
//!
//! Presence is the set of joined display names. Every join and leave broadcasts a
//! `PresenceChange` carrying the full list as it stood right after the transition.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Snapshot attached to `presence-joined` / `presence-left`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    /// The name that joined or left.
    pub name: String,
    pub count: usize,
    /// Joined names, earliest join first.
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceResponse {
    pub count: usize,
    pub names: Vec<String>,
}

/// GET /api/presence: returns who is currently in the room.
pub async fn get_presence(State(state): State<AppState>) -> Json<PresenceResponse> {
    let names = state.sessions.list_names();
    Json(PresenceResponse {
        count: names.len(),
        names,
    })
}

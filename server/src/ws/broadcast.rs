use axum::extract::ws::Message;

use super::{ConnectionRegistry, ConnectionSender};
use crate::proto::ServerEvent;
use crate::session::ConnectionId;

/// Serialize once; every recipient gets a clone of the same frame.
fn encode(event: &ServerEvent) -> Option<Message> {
    match event.encode() {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Broadcast an event to every live connection, including the originator.
/// Recipients whose channel is already closed are skipped silently.
pub fn broadcast_all(registry: &ConnectionRegistry, event: &ServerEvent) {
    let Some(msg) = encode(event) else {
        return;
    };

    for entry in registry.iter() {
        let _ = entry.value().send(msg.clone());
    }
}

/// Broadcast an event to every live connection except `exclude`.
pub fn broadcast_others(registry: &ConnectionRegistry, event: &ServerEvent, exclude: ConnectionId) {
    let Some(msg) = encode(event) else {
        return;
    };

    for entry in registry.iter().filter(|entry| *entry.key() != exclude) {
        let _ = entry.value().send(msg.clone());
    }
}

/// Send an event over a connection's own channel.
pub fn send_event(tx: &ConnectionSender, event: &ServerEvent) {
    if let Some(msg) = encode(event) {
        let _ = tx.send(msg);
    }
}

//! Typed fan-out helpers for chat, presence and typing events.

use crate::chat::messages::ChatMessage;
use crate::chat::presence::PresenceChange;
use crate::proto::ServerEvent;
use crate::session::ConnectionId;
use crate::ws::broadcast::{broadcast_all, broadcast_others};
use crate::ws::ConnectionRegistry;

/// Broadcast a new chat message to every connection, sender included.
pub fn broadcast_new_message(registry: &ConnectionRegistry, message: ChatMessage) {
    broadcast_all(registry, &ServerEvent::Message(message));
}

/// Announce a successful join to every connection, the joiner included.
pub fn broadcast_user_joined(registry: &ConnectionRegistry, change: &PresenceChange) {
    broadcast_all(registry, &ServerEvent::PresenceJoined(change.clone()));
}

/// Announce a departure to every remaining connection.
pub fn broadcast_user_left(registry: &ConnectionRegistry, change: &PresenceChange) {
    broadcast_all(registry, &ServerEvent::PresenceLeft(change.clone()));
}

pub fn broadcast_typing_started(registry: &ConnectionRegistry, name: &str, typist: ConnectionId) {
    let event = ServerEvent::TypingStarted {
        name: name.to_string(),
    };
    broadcast_others(registry, &event, typist);
}

pub fn broadcast_typing_stopped(registry: &ConnectionRegistry, name: &str, typist: ConnectionId) {
    let event = ServerEvent::TypingStopped {
        name: name.to_string(),
    };
    broadcast_others(registry, &event, typist);
}

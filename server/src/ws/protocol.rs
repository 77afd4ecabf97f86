//! Per-connection event dispatch.
//!
//! Every inbound frame is decoded into a `ClientEvent` and validated against the session
//! state before anything is broadcast. All handlers are synchronous: they only touch the
//! in-memory session state and enqueue frames on unbounded channels.

use crate::chat::broadcast::{
    broadcast_new_message, broadcast_typing_started, broadcast_typing_stopped,
    broadcast_user_joined, broadcast_user_left,
};
use crate::proto::{ClientEvent, ServerEvent, INVALID_EVENT};
use crate::session::{ConnectionId, SessionError};
use crate::state::AppState;
use crate::ws::broadcast::send_event;
use crate::ws::ConnectionSender;

/// Handle an incoming text frame.
pub fn handle_text_message(
    text: &str,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
) {
    let event = match ClientEvent::decode(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                error = %e,
                "Failed to decode client event"
            );
            reject_undecodable(connection_id, tx);
            return;
        }
    };

    dispatch_event(event, connection_id, tx, state);
}

/// Reply to a frame that is not a valid client event. The connection stays open.
pub fn reject_undecodable(connection_id: ConnectionId, tx: &ConnectionSender) {
    tracing::trace!(connection_id = %connection_id, "Rejecting undecodable frame");
    send_error(tx, INVALID_EVENT, "Expected a JSON event with a known type");
}

/// Dispatch a decoded event to the appropriate handler.
pub fn dispatch_event(
    event: ClientEvent,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
) {
    match event {
        ClientEvent::Join { name } => handle_join(&name, connection_id, tx, state),
        ClientEvent::Message { body } => handle_chat_message(&body, connection_id, tx, state),
        ClientEvent::TypingStart => handle_typing(true, connection_id, tx, state),
        ClientEvent::TypingStop => handle_typing(false, connection_id, tx, state),
    }
}

fn handle_join(
    requested: &str,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
) {
    // Both frames are queued under the session lock; the joiner sees its confirmation first.
    let joined = state.sessions.join_with(connection_id, requested, |change| {
        send_event(
            tx,
            &ServerEvent::JoinAccepted {
                name: change.name.clone(),
            },
        );
        broadcast_user_joined(&state.connections, change);
    });

    match joined {
        Ok(change) => {
            tracing::info!(
                connection_id = %connection_id,
                name = %change.name,
                count = change.count,
                "User joined"
            );
        }
        Err(err) => {
            tracing::debug!(
                connection_id = %connection_id,
                reason = err.as_code(),
                "Join rejected"
            );
            send_event(
                tx,
                &ServerEvent::JoinRejected {
                    reason: err.as_code().to_string(),
                },
            );
        }
    }
}

fn handle_chat_message(
    body: &str,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
) {
    match state.sessions.compose_message(connection_id, body) {
        Ok(Some(message)) => broadcast_new_message(&state.connections, message),
        Ok(None) => {
            tracing::trace!(connection_id = %connection_id, "Ignoring empty message");
        }
        Err(err) => reject(tx, connection_id, err),
    }
}

fn handle_typing(
    started: bool,
    connection_id: ConnectionId,
    tx: &ConnectionSender,
    state: &AppState,
) {
    let Some(name) = state.sessions.lookup_name(connection_id) else {
        reject(tx, connection_id, SessionError::NotJoined);
        return;
    };

    if started {
        broadcast_typing_started(&state.connections, &name, connection_id);
    } else {
        broadcast_typing_stopped(&state.connections, &name, connection_id);
    }
}

/// Tear down a connection: stop delivering to it, release its name, and announce the
/// departure if it had joined. Safe to call more than once.
pub fn handle_disconnect(connection_id: ConnectionId, state: &AppState) {
    state.connections.remove(&connection_id);

    // Queued under the session lock, like joins.
    let left = state.sessions.leave_with(connection_id, |change| {
        broadcast_user_left(&state.connections, change);
    });

    if let Some(change) = left {
        tracing::info!(
            connection_id = %connection_id,
            name = %change.name,
            count = change.count,
            "User left"
        );
    }
}

fn reject(tx: &ConnectionSender, connection_id: ConnectionId, err: SessionError) {
    tracing::debug!(
        connection_id = %connection_id,
        code = err.as_code(),
        "Rejected client event"
    );
    send_error(tx, err.as_code(), &err.to_string());
}

/// Send an error event to the originating connection only.
fn send_error(tx: &ConnectionSender, code: &str, message: &str) {
    send_event(
        tx,
        &ServerEvent::Error {
            code: code.to_string(),
            message: message.to_string(),
        },
    );
}

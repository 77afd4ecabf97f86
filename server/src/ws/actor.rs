use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::session::ConnectionId;
use crate::state::AppState;
use crate::ws::protocol;

/// Close code sent when the heartbeat goes unanswered (1001 = going away).
const CLOSE_GOING_AWAY: u16 = 1001;

/// How long the writer gets to flush the close frame after a heartbeat timeout.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Run the actor-per-connection pattern for one WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Ping task: sends periodic pings; when a pong is late it queues a Close frame and
///   exits, which also ends the reader loop once the writer has flushed that frame
/// - Reader loop (this task): decodes frames and dispatches to the protocol handler
///
/// The connection is attached to the registry before the first frame is read, so it
/// receives presence broadcasts while still unjoined. The disconnect path runs exactly
/// once, after the reader loop ends for any reason.
pub async fn run_connection(
    socket: WebSocket,
    state: AppState,
    connection_id: ConnectionId,
    remote_addr: SocketAddr,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    state.connections.insert(connection_id, tx.clone());

    tracing::info!(
        connection_id = %connection_id,
        remote_addr = %remote_addr,
        connections = state.connections.len(),
        "WebSocket actor started"
    );

    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let mut ping_handle = tokio::spawn(ping_task(
        tx.clone(),
        pong_rx,
        state.limits.ping_interval(),
        state.limits.pong_timeout(),
    ));

    let mut heartbeat_lost = false;
    loop {
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = &mut ping_handle => {
                tracing::info!(
                    connection_id = %connection_id,
                    "Heartbeat lost, dropping connection"
                );
                heartbeat_lost = true;
                break;
            }
        };

        match next {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_message(text.as_str(), connection_id, &tx, &state);
                }
                Message::Binary(data) => {
                    // Events are JSON text frames; accept UTF-8 binary frames as a courtesy.
                    match std::str::from_utf8(&data) {
                        Ok(text) => {
                            protocol::handle_text_message(text, connection_id, &tx, &state)
                        }
                        Err(_) => protocol::reject_undecodable(connection_id, &tx),
                    }
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(connection_id = %connection_id, "WebSocket stream ended");
                break;
            }
        }
    }

    if heartbeat_lost {
        // The ping task queued a Close frame; the writer exits once it is sent.
        if timeout(CLOSE_FLUSH_TIMEOUT, &mut writer_handle).await.is_err() {
            tracing::debug!(connection_id = %connection_id, "Close frame not flushed in time");
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    protocol::handle_disconnect(connection_id, &state);

    tracing::info!(
        connection_id = %connection_id,
        connections = state.connections.len(),
        "WebSocket actor stopped"
    );
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}

/// Ping task: one ping per interval, close the connection when a pong is late.
async fn ping_task(
    tx: mpsc::UnboundedSender<Message>,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    ping_interval: Duration,
    pong_timeout: Duration,
) {
    let mut ping_timer = interval(ping_interval);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        if tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            // Writer task has died
            break;
        }

        match timeout(pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!("Pong timeout, closing connection");
                let _ = tx.send(Message::Close(Some(CloseFrame {
                    code: CLOSE_GOING_AWAY,
                    reason: "Pong timeout".into(),
                })));
                break;
            }
        }
    }
}

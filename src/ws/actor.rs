use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::relay::{Address, ConnectionId};
use crate::state::AppState;
use crate::ws::{protocol, ConnectionSender};

/// Server-side keepalive ping cadence. Abrupt disconnects (NAT timeouts,
/// suspended laptops) never produce a close frame; the ping cycle is what
/// reaps them.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Silence window after a ping before the connection is declared dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// One actor per authenticated connection.
///
/// The socket splits into a writer task that owns the sink and drains an
/// mpsc channel, and a reader loop running here. Anything in the process can
/// reach this client by cloning the channel sender out of the registry; the
/// channel is what makes per-connection write order a guarantee.
///
/// The connection answers to its user address from the first instant, so
/// notification pushes need no opt-in. Peer addresses come later through
/// `register` frames. Whatever ends the reader loop (close frame, transport
/// error, stream end, pong timeout), teardown below it runs exactly once.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let conn_id = ConnectionId::new();
    state.registry.attach(conn_id, tx.clone());
    state.registry.register(conn_id, Address::User(user_id.clone()));

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket actor started");

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_handle = tokio::spawn(ping_task(tx.clone(), pong_rx, conn_id));

    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(&text, conn_id, &tx, &state.registry, &user_id);
                }
                Message::Binary(_) => {
                    // The protocol is JSON text frames
                    tracing::debug!(user_id = %user_id, "Ignoring binary frame");
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        user_id = %user_id,
                        conn_id = %conn_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    user_id = %user_id,
                    conn_id = %conn_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // CLOSED: single cleanup path for every disconnect cause.
    writer_handle.abort();
    ping_handle.abort();
    state.registry.unregister_all(conn_id);

    tracing::info!(user_id = %user_id, conn_id = %conn_id, "WebSocket actor stopped");
}

/// Drains the connection's channel into the WebSocket sink. Ends when the
/// channel closes or a send fails; either way the reader loop notices soon
/// after and runs teardown.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}

/// Pings on a fixed cadence and waits for the reader loop to report each
/// pong. A missed pong queues a 1001 close; the client's TCP stack or the
/// reader loop takes it from there.
async fn ping_task(
    tx: ConnectionSender,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    conn_id: ConnectionId,
) {
    let mut ping_timer = interval(PING_INTERVAL);
    // Skip the immediate first tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        if tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            break;
        }

        match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!(conn_id = %conn_id, "Pong timeout, closing connection");
                let _ = tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Pong timeout".into(),
                })));
                break;
            }
        }
    }
}

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::state::AppState;
use crate::ws::actor;

/// `?token=JWT` on the upgrade request. Browsers cannot set headers on a
/// WebSocket handshake, so the token rides the query string.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

const CLOSE_TOKEN_EXPIRED: u16 = 4001;
const CLOSE_TOKEN_INVALID: u16 = 4002;

/// GET /ws?token=JWT -- Authenticated WebSocket upgrade.
///
/// A bad token still upgrades: the handshake completes and the server closes
/// with 4001 (expired) or 4002 (invalid), because browser WebSocket clients
/// cannot read a rejected handshake's status but do see a close code. A good
/// token hands the socket to the connection actor.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsAuthQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match jwt::validate_access_token(&state.jwt_secret, &params.token) {
        Ok(claims) => {
            tracing::info!(user_id = %claims.sub, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, claims.sub))
        }
        Err(err) => {
            let (code, reason) = close_code_for(&err);
            tracing::warn!(close_code = code, reason = reason, "WebSocket auth failed");
            ws.on_upgrade(move |socket| reject(socket, code, reason))
        }
    }
}

fn close_code_for(err: &jsonwebtoken::errors::Error) -> (u16, &'static str) {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            (CLOSE_TOKEN_EXPIRED, "Token expired")
        }
        _ => (CLOSE_TOKEN_INVALID, "Token invalid"),
    }
}

async fn reject(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

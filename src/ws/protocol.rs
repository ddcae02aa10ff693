use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

use crate::db::models::Notification;
use crate::relay::{ConnectionId, ConnectionRegistry, SignalKind};
use crate::signaling;
use crate::ws::ConnectionSender;

/// A decoded client frame. The wire shape is one JSON object per text
/// frame, tagged by `event`:
///
///   {"event":"register","peerId":"a1b2"}
///   {"event":"offer","to":"a1b2","payload":{...}}
///   {"event":"answer","to":"a1b2","payload":{...}}
///   {"event":"ice-candidate","to":"a1b2","payload":{...}}
///
/// Signaling payloads are opaque: captured raw and re-emitted verbatim.
#[derive(Debug)]
pub enum ClientFrame {
    Register { peer_id: String },
    Offer { to: String, payload: Box<RawValue> },
    Answer { to: String, payload: Box<RawValue> },
    IceCandidate { to: String, payload: Box<RawValue> },
}

/// Why a client frame could not be decoded.
#[derive(Debug)]
pub enum FrameError {
    Json(serde_json::Error),
    MissingField(&'static str),
    UnknownEvent(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Json(e) => write!(f, "invalid JSON: {}", e),
            FrameError::MissingField(field) => write!(f, "missing field `{}`", field),
            FrameError::UnknownEvent(event) => write!(f, "unknown event `{}`", event),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<serde_json::Error> for FrameError {
    fn from(e: serde_json::Error) -> Self {
        FrameError::Json(e)
    }
}

/// Raw shape of every inbound frame; which fields must be present depends
/// on `event`. Decoded in one pass so the payload stays a raw slice of the
/// incoming text instead of a parsed tree.
#[derive(Debug, Deserialize)]
struct WireFrame {
    event: String,
    #[serde(default, rename = "peerId")]
    peer_id: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    payload: Option<Box<RawValue>>,
}

/// Decode one client frame from frame text.
pub fn decode_client_frame(text: &str) -> Result<ClientFrame, FrameError> {
    let wire: WireFrame = serde_json::from_str(text)?;
    match wire.event.as_str() {
        "register" => {
            let peer_id = wire.peer_id.ok_or(FrameError::MissingField("peerId"))?;
            Ok(ClientFrame::Register { peer_id })
        }
        "offer" | "answer" | "ice-candidate" => {
            let to = wire.to.ok_or(FrameError::MissingField("to"))?;
            let payload = wire.payload.ok_or(FrameError::MissingField("payload"))?;
            Ok(match wire.event.as_str() {
                "offer" => ClientFrame::Offer { to, payload },
                "answer" => ClientFrame::Answer { to, payload },
                _ => ClientFrame::IceCandidate { to, payload },
            })
        }
        other => Err(FrameError::UnknownEvent(other.to_string())),
    }
}

/// Handle one incoming text frame: decode, then dispatch to the signaling
/// relay. Undecodable frames get an error frame back; the connection stays
/// open.
pub fn handle_text_frame(
    text: &str,
    conn_id: ConnectionId,
    tx: &ConnectionSender,
    registry: &ConnectionRegistry,
    user_id: &str,
) {
    let frame = match decode_client_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                conn_id = %conn_id,
                error = %e,
                "Failed to decode client frame"
            );
            send_error(tx, 400, "Invalid frame");
            return;
        }
    };

    match frame {
        ClientFrame::Register { peer_id } => {
            signaling::register_peer(registry, conn_id, peer_id);
        }
        ClientFrame::Offer { to, payload } => {
            signaling::relay_offer(registry, to, payload);
        }
        ClientFrame::Answer { to, payload } => {
            signaling::relay_answer(registry, to, payload);
        }
        ClientFrame::IceCandidate { to, payload } => {
            signaling::relay_ice_candidate(registry, to, payload);
        }
    }
}

/// Push payload for the `notification` event: the client-facing projection
/// of a persisted record. `is_seen` stays server-side; the receiving
/// connection is the user, so no user id is echoed.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub id: String,
    pub message: String,
    #[serde(rename = "relatedInterest")]
    pub interest_id: Option<String>,
    #[serde(rename = "event")]
    pub event_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

impl From<&Notification> for NotificationEvent {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.clone(),
            message: n.message.clone(),
            interest_id: n.interest_id.clone(),
            event_id: n.event_id.clone(),
            created_at: n.created_at.clone(),
        }
    }
}

#[derive(Serialize)]
struct SignalFrame<'a> {
    event: &'static str,
    to: &'a str,
    payload: &'a RawValue,
}

#[derive(Serialize)]
struct NotificationFrame<'a> {
    event: &'static str,
    payload: &'a NotificationEvent,
}

#[derive(Serialize)]
struct ErrorFrame<'a> {
    event: &'static str,
    code: u32,
    message: &'a str,
}

/// Serialize one outbound signaling frame. The payload slot receives the
/// sender's raw JSON unchanged.
pub fn signal_text(kind: SignalKind, to: &str, payload: &RawValue) -> serde_json::Result<String> {
    serde_json::to_string(&SignalFrame {
        event: kind.event_name(),
        to,
        payload,
    })
}

/// Serialize one outbound notification frame.
pub fn notification_text(event: &NotificationEvent) -> serde_json::Result<String> {
    serde_json::to_string(&NotificationFrame {
        event: "notification",
        payload: event,
    })
}

/// Queue an error frame on one connection.
pub fn send_error(tx: &ConnectionSender, code: u32, message: &str) {
    let frame = ErrorFrame {
        event: "error",
        code,
        message,
    };
    if let Ok(text) = serde_json::to_string(&frame) {
        let _ = tx.send(axum::extract::ws::Message::Text(text.into()));
    }
}

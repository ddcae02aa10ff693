//! WebRTC signaling relay.
//!
//! The server is a stateless forwarder: offers, answers and ICE candidates
//! are routed to the peer address named in the frame and never inspected.
//! Negotiation state lives entirely in the two browsers, so a relay restart
//! cannot corrupt a call in progress.

use serde_json::value::RawValue;

use crate::relay::{
    route, Address, ConnectionId, ConnectionRegistry, Envelope, RouteOutcome, SignalKind,
};

/// Bind an ephemeral peer id to the sending connection.
/// A connection may claim several peer ids over its lifetime. Claims by
/// other connections on the same id stay in place; routing fans out to
/// every holder.
pub fn register_peer(registry: &ConnectionRegistry, conn_id: ConnectionId, peer_id: String) {
    tracing::debug!(conn_id = %conn_id, peer_id = %peer_id, "Peer address registered");
    registry.register(conn_id, Address::Peer(peer_id));
}

/// Relay an SDP offer to the peer registered under `to`.
pub fn relay_offer(registry: &ConnectionRegistry, to: String, payload: Box<RawValue>) {
    relay(registry, SignalKind::Offer, to, payload);
}

/// Relay an SDP answer to the peer registered under `to`.
pub fn relay_answer(registry: &ConnectionRegistry, to: String, payload: Box<RawValue>) {
    relay(registry, SignalKind::Answer, to, payload);
}

/// Relay one trickle-ICE candidate to the peer registered under `to`.
/// Candidates from one sender to one receiver keep their send order end to
/// end; both peers feed them to the WebRTC stack incrementally.
pub fn relay_ice_candidate(registry: &ConnectionRegistry, to: String, payload: Box<RawValue>) {
    relay(registry, SignalKind::IceCandidate, to, payload);
}

fn relay(registry: &ConnectionRegistry, kind: SignalKind, to: String, payload: Box<RawValue>) {
    let outcome = route(
        registry,
        Envelope {
            kind,
            to: Address::Peer(to),
            payload,
        },
    );
    // Misses are logged by the router and never reported to the sender;
    // an absent peer surfaces as the caller's own negotiation timeout.
    if let RouteOutcome::Delivered(n) = outcome {
        tracing::trace!(kind = kind.event_name(), delivered = n, "Signal relayed");
    }
}

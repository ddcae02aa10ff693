use axum::extract::ws::Message;
use serde_json::value::RawValue;

use crate::relay::registry::{Address, ConnectionRegistry};
use crate::ws::protocol;

/// The three signaling message kinds relayed between peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// Wire event name; doubles as the log label.
    pub fn event_name(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }
}

/// A signaling message in flight: kind, destination, opaque payload.
/// The payload is the sender's raw JSON, re-emitted without inspection.
#[derive(Debug)]
pub struct Envelope {
    pub kind: SignalKind,
    pub to: Address,
    pub payload: Box<RawValue>,
}

/// Outcome of routing one frame to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Queued on this many live connections.
    Delivered(usize),
    /// No live connection took the frame: unknown address, or every
    /// resolved transport had already gone away.
    Miss,
}

/// Forward a signaling envelope to every connection bound to its target.
pub fn route(registry: &ConnectionRegistry, envelope: Envelope) -> RouteOutcome {
    let Envelope { kind, to, payload } = envelope;
    let text = match protocol::signal_text(kind, to.key(), &payload) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(address = %to, error = %e, "Failed to serialize outbound signal");
            return RouteOutcome::Miss;
        }
    };
    deliver(registry, &to, text)
}

/// Fan one already-serialized frame out to every live connection bound to
/// the target. Serialization happens once; each connection gets a clone of
/// the frame. A closed transport on one connection never blocks the others.
pub fn deliver(registry: &ConnectionRegistry, target: &Address, text: String) -> RouteOutcome {
    let resolved = registry.resolve(target);
    if resolved.is_empty() {
        tracing::debug!(address = %target, "Delivery miss: no live connection");
        return RouteOutcome::Miss;
    }

    let message = Message::Text(text.into());
    let mut delivered = 0;
    for (conn_id, sender) in resolved {
        // Send fails only when the writer task is gone; teardown reaps the binding.
        if sender.send(message.clone()).is_ok() {
            delivered += 1;
        } else {
            tracing::debug!(
                conn_id = %conn_id,
                address = %target,
                "Dropped frame for closed transport"
            );
        }
    }

    if delivered == 0 {
        tracing::debug!(address = %target, "Delivery miss: all resolved transports closed");
        RouteOutcome::Miss
    } else {
        RouteOutcome::Delivered(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::registry::ConnectionId;
    use tokio::sync::mpsc;

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    fn frame_json(msg: &Message) -> serde_json::Value {
        match msg {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn route_to_unknown_address_is_miss() {
        let registry = ConnectionRegistry::new();
        let outcome = route(
            &registry,
            Envelope {
                kind: SignalKind::Offer,
                to: Address::Peer("nobody".to_string()),
                payload: raw(r#"{"sdp":"v=0"}"#),
            },
        );
        assert_eq!(outcome, RouteOutcome::Miss);
    }

    #[test]
    fn route_fans_out_to_all_connections() {
        let registry = ConnectionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        registry.attach(a, tx_a);
        registry.attach(b, tx_b);
        registry.register(a, Address::Peer("p2".to_string()));
        registry.register(b, Address::Peer("p2".to_string()));

        let outcome = route(
            &registry,
            Envelope {
                kind: SignalKind::Offer,
                to: Address::Peer("p2".to_string()),
                payload: raw(r#"{"sdp":"v=0"}"#),
            },
        );
        assert_eq!(outcome, RouteOutcome::Delivered(2));

        for rx in [&mut rx_a, &mut rx_b] {
            let frame = frame_json(&rx.try_recv().unwrap());
            assert_eq!(frame["event"], "offer");
            assert_eq!(frame["to"], "p2");
            assert_eq!(frame["payload"]["sdp"], "v=0");
        }
    }

    #[test]
    fn closed_transport_is_skipped_others_still_delivered() {
        let registry = ConnectionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        registry.attach(a, tx_a);
        registry.attach(b, tx_b);
        registry.register(a, Address::Peer("p2".to_string()));
        registry.register(b, Address::Peer("p2".to_string()));

        // Simulate a dead writer task on connection a.
        drop(rx_a);

        let outcome = route(
            &registry,
            Envelope {
                kind: SignalKind::Answer,
                to: Address::Peer("p2".to_string()),
                payload: raw(r#"{"sdp":"v=0"}"#),
            },
        );
        assert_eq!(outcome, RouteOutcome::Delivered(1));
        assert_eq!(frame_json(&rx_b.try_recv().unwrap())["event"], "answer");
    }

    #[test]
    fn all_transports_closed_is_miss() {
        let registry = ConnectionRegistry::new();
        let a = ConnectionId::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();

        registry.attach(a, tx_a);
        registry.register(a, Address::Peer("p2".to_string()));
        drop(rx_a);

        let outcome = route(
            &registry,
            Envelope {
                kind: SignalKind::IceCandidate,
                to: Address::Peer("p2".to_string()),
                payload: raw(r#"{"candidate":"c1"}"#),
            },
        );
        assert_eq!(outcome, RouteOutcome::Miss);
    }

    #[test]
    fn frames_arrive_in_route_order() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.attach(id, tx);
        registry.register(id, Address::Peer("p2".to_string()));

        route(
            &registry,
            Envelope {
                kind: SignalKind::Offer,
                to: Address::Peer("p2".to_string()),
                payload: raw(r#"{"sdp":"v=0"}"#),
            },
        );
        for i in 0..3 {
            route(
                &registry,
                Envelope {
                    kind: SignalKind::IceCandidate,
                    to: Address::Peer("p2".to_string()),
                    payload: raw(&format!(r#"{{"candidate":"c{}"}}"#, i)),
                },
            );
        }

        assert_eq!(frame_json(&rx.try_recv().unwrap())["event"], "offer");
        for i in 0..3 {
            let frame = frame_json(&rx.try_recv().unwrap());
            assert_eq!(frame["event"], "ice-candidate");
            assert_eq!(frame["payload"]["candidate"], format!("c{}", i));
        }
    }

    #[test]
    fn payload_is_forwarded_verbatim() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.attach(id, tx);
        registry.register(id, Address::Peer("p2".to_string()));

        // Odd spacing and key order must survive the relay untouched.
        let payload = r#"{"sdp":  "v=0\r\no=- 42 2 IN IP4 127.0.0.1",  "type":"offer"}"#;
        route(
            &registry,
            Envelope {
                kind: SignalKind::Offer,
                to: Address::Peer("p2".to_string()),
                payload: raw(payload),
            },
        );

        let msg = rx.try_recv().unwrap();
        let text = match &msg {
            Message::Text(text) => text.as_str().to_string(),
            other => panic!("expected text frame, got {:?}", other),
        };
        assert!(text.contains(payload), "payload was rewritten: {}", text);
    }
}

use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::ws::ConnectionSender;

/// Opaque server-assigned identifier for one live connection.
/// Minted at upgrade time, never reused after teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical routing key, independent of transport identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Stable identifier assigned at authentication; notification target.
    User(String),
    /// Ephemeral identifier claimed by the client for a signaling session.
    Peer(String),
}

impl Address {
    /// The raw key without the kind discriminant.
    pub fn key(&self) -> &str {
        match self {
            Address::User(id) | Address::Peer(id) => id,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::User(id) => write!(f, "user:{}", id),
            Address::Peer(id) => write!(f, "peer:{}", id),
        }
    }
}

/// Connection registry: the live transport handle per connection, plus the
/// logical addresses each connection answers to.
///
/// A user can be registered from several connections at once (multiple tabs)
/// and a connection can hold several addresses (its user id plus any peer ids
/// it claimed). State is process-local and rebuilt by clients on reconnect.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Live transport handle per connection id.
    connections: DashMap<ConnectionId, ConnectionSender>,
    /// Address -> connection ids currently bound to it.
    addresses: DashMap<Address, HashSet<ConnectionId>>,
    /// Reverse index for teardown: connection id -> addresses it holds.
    bindings: DashMap<ConnectionId, HashSet<Address>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the live transport handle for a connection entering OPEN.
    pub fn attach(&self, id: ConnectionId, sender: ConnectionSender) {
        self.connections.insert(id, sender);
        tracing::debug!(conn_id = %id, total = self.connections.len(), "Connection attached");
    }

    /// Bind a logical address to a connection. Idempotent; a connection may
    /// hold any number of addresses. Ignored when the connection is no
    /// longer attached, so bindings never outlive their owner.
    pub fn register(&self, id: ConnectionId, address: Address) {
        if !self.connections.contains_key(&id) {
            tracing::debug!(
                conn_id = %id,
                address = %address,
                "Register on detached connection ignored"
            );
            return;
        }
        self.addresses.entry(address.clone()).or_default().insert(id);
        self.bindings.entry(id).or_default().insert(address);
    }

    /// Remove the transport handle and every address binding for a
    /// connection. Safe to call repeatedly; later calls are no-ops.
    pub fn unregister_all(&self, id: ConnectionId) {
        self.connections.remove(&id);
        let Some((_, bound)) = self.bindings.remove(&id) else {
            return;
        };
        for address in bound {
            if let Some(mut ids) = self.addresses.get_mut(&address) {
                ids.remove(&id);
                let empty = ids.is_empty();
                drop(ids);
                if empty {
                    self.addresses.remove_if(&address, |_, ids| ids.is_empty());
                }
            }
        }
        tracing::debug!(conn_id = %id, total = self.connections.len(), "Connection unregistered");
    }

    /// Resolve an address to the live connections currently bound to it.
    /// Unknown addresses and already-detached connections yield nothing.
    pub fn resolve(&self, address: &Address) -> Vec<(ConnectionId, ConnectionSender)> {
        let Some(ids) = self.addresses.get(address) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| self.connections.get(id).map(|s| (*id, s.value().clone())))
            .collect()
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    fn sender() -> (ConnectionSender, mpsc::UnboundedReceiver<Message>) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn resolve_returns_registered_connection() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = sender();

        registry.attach(id, tx);
        registry.register(id, Address::User("alice".to_string()));

        let resolved = registry.resolve(&Address::User("alice".to_string()));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, id);
    }

    #[test]
    fn resolve_unknown_address_is_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.resolve(&Address::Peer("nobody".to_string())).is_empty());
    }

    #[test]
    fn register_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = sender();

        registry.attach(id, tx);
        registry.register(id, Address::Peer("p1".to_string()));
        registry.register(id, Address::Peer("p1".to_string()));

        assert_eq!(registry.resolve(&Address::Peer("p1".to_string())).len(), 1);
    }

    #[test]
    fn connection_holds_multiple_addresses() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = sender();

        registry.attach(id, tx);
        registry.register(id, Address::User("alice".to_string()));
        registry.register(id, Address::Peer("p1".to_string()));
        registry.register(id, Address::Peer("p2".to_string()));

        assert_eq!(registry.resolve(&Address::User("alice".to_string())).len(), 1);
        assert_eq!(registry.resolve(&Address::Peer("p1".to_string())).len(), 1);
        assert_eq!(registry.resolve(&Address::Peer("p2".to_string())).len(), 1);
    }

    #[test]
    fn same_address_fans_out_to_multiple_connections() {
        let registry = ConnectionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let (tx_a, _rx_a) = sender();
        let (tx_b, _rx_b) = sender();

        registry.attach(a, tx_a);
        registry.attach(b, tx_b);
        registry.register(a, Address::User("alice".to_string()));
        registry.register(b, Address::User("alice".to_string()));

        let resolved = registry.resolve(&Address::User("alice".to_string()));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn unregister_all_removes_every_binding() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = sender();

        registry.attach(id, tx);
        registry.register(id, Address::User("alice".to_string()));
        registry.register(id, Address::Peer("p1".to_string()));

        registry.unregister_all(id);

        assert!(registry.resolve(&Address::User("alice".to_string())).is_empty());
        assert!(registry.resolve(&Address::Peer("p1".to_string())).is_empty());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn unregister_all_twice_is_noop() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = sender();

        registry.attach(id, tx);
        registry.register(id, Address::User("alice".to_string()));

        registry.unregister_all(id);
        registry.unregister_all(id);

        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn unregister_leaves_other_connections_bound() {
        let registry = ConnectionRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let (tx_a, _rx_a) = sender();
        let (tx_b, _rx_b) = sender();

        registry.attach(a, tx_a);
        registry.attach(b, tx_b);
        registry.register(a, Address::User("alice".to_string()));
        registry.register(b, Address::User("alice".to_string()));

        registry.unregister_all(a);

        let resolved = registry.resolve(&Address::User("alice".to_string()));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, b);
    }

    #[test]
    fn register_after_teardown_is_ignored() {
        let registry = ConnectionRegistry::new();
        let id = ConnectionId::new();
        let (tx, _rx) = sender();

        registry.attach(id, tx);
        registry.unregister_all(id);
        registry.register(id, Address::Peer("p1".to_string()));

        assert!(registry.resolve(&Address::Peer("p1".to_string())).is_empty());
    }
}

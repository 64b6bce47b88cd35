//! Peers and the known-peers table.

use parking_lot::RwLock;
use opb_chain::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A remote node, identified by `ip:port`.
///
/// `connected` is local bookkeeping for the one-time join handshake and is
/// never put on the wire.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PeerNode {
    pub ip: String,
    pub port: u16,
    pub account: Address,
    pub is_bootstrap: bool,
    #[serde(skip)]
    pub connected: bool,
}

impl PeerNode {
    pub fn new(
        ip: impl Into<String>,
        port: u16,
        is_bootstrap: bool,
        account: Address,
        connected: bool,
    ) -> Self {
        Self {
            ip: ip.into(),
            port,
            account,
            is_bootstrap,
            connected,
        }
    }

    /// Table key and dial target.
    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

/// The known-peers table. The node itself is never a member.
pub struct PeerTable {
    self_ip: String,
    self_port: u16,
    peers: RwLock<HashMap<String, PeerNode>>,
}

impl PeerTable {
    /// New table seeded with the optional bootstrap peer.
    pub fn new(self_ip: impl Into<String>, self_port: u16, bootstrap: Option<PeerNode>) -> Self {
        let table = Self {
            self_ip: self_ip.into(),
            self_port,
            peers: RwLock::new(HashMap::new()),
        };
        if let Some(peer) = bootstrap {
            table.add(peer);
        }
        table
    }

    fn is_self(&self, peer: &PeerNode) -> bool {
        peer.ip == self.self_ip && peer.port == self.self_port
    }

    /// Insert or replace a peer. Adding the node itself is a no-op.
    pub fn add(&self, peer: PeerNode) {
        if self.is_self(&peer) {
            return;
        }
        debug!(peer = %peer.tcp_address(), "peer added to known peers");
        self.peers.write().insert(peer.tcp_address(), peer);
    }

    pub fn remove(&self, addr: &str) {
        self.peers.write().remove(addr);
    }

    /// Known, or the node itself (which needs no entry).
    pub fn is_known(&self, peer: &PeerNode) -> bool {
        self.is_self(peer) || self.peers.read().contains_key(&peer.tcp_address())
    }

    /// Latch the one-time join handshake.
    pub fn mark_connected(&self, addr: &str) {
        if let Some(peer) = self.peers.write().get_mut(addr) {
            peer.connected = true;
        }
    }

    pub fn snapshot(&self) -> HashMap<String, PeerNode> {
        self.peers.read().clone()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(ip: &str, port: u16) -> PeerNode {
        PeerNode::new(ip, port, false, Address::ZERO, false)
    }

    #[test]
    fn self_is_never_added_but_always_known() {
        let table = PeerTable::new("127.0.0.1", 8081, None);
        let me = peer("127.0.0.1", 8081);

        table.add(me.clone());
        assert!(table.is_empty());
        assert!(table.is_known(&me));
    }

    #[test]
    fn bootstrap_peer_seeds_the_table() {
        let bootstrap = PeerNode::new("10.0.0.1", 8081, true, Address::ZERO, false);
        let table = PeerTable::new("127.0.0.1", 8081, Some(bootstrap.clone()));

        assert_eq!(table.len(), 1);
        assert!(table.is_known(&bootstrap));

        // No bootstrap configured: table starts empty.
        let lonely = PeerTable::new("127.0.0.1", 8081, None);
        assert!(lonely.is_empty());
    }

    #[test]
    fn mark_connected_latches() {
        let table = PeerTable::new("127.0.0.1", 8081, None);
        let other = peer("10.0.0.2", 9000);
        table.add(other.clone());

        table.mark_connected(&other.tcp_address());
        assert!(table.snapshot()[&other.tcp_address()].connected);

        table.remove(&other.tcp_address());
        assert!(!table.is_known(&other));
    }

    #[test]
    fn connected_flag_stays_off_the_wire() {
        let mut p = peer("10.0.0.2", 9000);
        p.connected = true;

        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("connected"));

        let back: PeerNode = serde_json::from_str(&json).unwrap();
        assert!(!back.connected);
        assert_eq!(back.tcp_address(), "10.0.0.2:9000");
    }
}

//! Peer table (spec.md §4.4): discovered mediators, evicted after two
//! missed heartbeat intervals.

use std::collections::HashMap;

use medi_core::Peer;

#[derive(Default)]
pub struct PeerTable {
    peers: HashMap<String, Peer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn load(peers: Vec<Peer>) -> Self {
        let mut table = Self::new();
        for peer in peers {
            table.peers.insert(peer.peer_id.clone(), peer);
        }
        table
    }

    pub fn all(&self) -> Vec<Peer> {
        self.peers.values().cloned().collect()
    }

    pub fn get(&self, peer_id: &str) -> Option<&Peer> {
        self.peers.get(peer_id)
    }

    /// Record an `announce` or a discovered peer — inserts or refreshes.
    pub fn upsert(&mut self, peer: Peer) {
        self.peers.insert(peer.peer_id.clone(), peer);
    }

    /// Record a `heartbeat` — refreshes `lastSeen`/`load` for a known peer
    /// only; an unknown peer must `announce` first.
    pub fn heartbeat(&mut self, peer_id: &str, load: f64, now: i64) {
        if let Some(peer) = self.peers.get_mut(peer_id) {
            peer.last_seen = now;
            peer.load = load;
        }
    }

    pub fn evict_stale(&mut self, now: i64, heartbeat_interval_secs: i64) {
        self.peers.retain(|_, peer| !peer.is_stale(now, heartbeat_interval_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str, last_seen: i64) -> Peer {
        Peer {
            peer_id: id.to_string(),
            endpoint: "http://localhost:9000".to_string(),
            last_seen,
            reputation: 1.0,
            load: 0.0,
            capabilities: vec![],
        }
    }

    #[test]
    fn stale_peers_are_evicted() {
        let mut table = PeerTable::new();
        table.upsert(peer("a", 0));
        table.upsert(peer("b", 1_000));
        table.evict_stale(1_000, 30);
        assert!(table.get("a").is_none());
        assert!(table.get("b").is_some());
    }

    #[test]
    fn heartbeat_refreshes_known_peer_only() {
        let mut table = PeerTable::new();
        table.upsert(peer("a", 0));
        table.heartbeat("a", 42.0, 500);
        table.heartbeat("unknown", 1.0, 500);
        assert_eq!(table.get("a").unwrap().load, 42.0);
        assert!(table.get("unknown").is_none());
    }
}

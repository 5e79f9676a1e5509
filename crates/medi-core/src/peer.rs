use serde::{Deserialize, Serialize};

/// A known mediator on the peer mesh (spec.md §3, §4.4).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Peer {
    /// The peer's public key, hex-encoded.
    pub peer_id: String,
    pub endpoint: String,
    pub last_seen: i64,
    pub reputation: f64,
    pub load: f64,
    pub capabilities: Vec<String>,
}

impl Peer {
    /// A peer unseen for `2 * heartbeat_interval` is dropped (spec.md §4.4).
    pub fn is_stale(&self, now: i64, heartbeat_interval_secs: i64) -> bool {
        now - self.last_seen > 2 * heartbeat_interval_secs
    }
}

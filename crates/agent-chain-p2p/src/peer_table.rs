use std::collections::HashMap;

use libp2p::PeerId;

/// A single connected peer (§4.4).
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub remote_addr: String,
    pub last_seen: i64,
}

/// The live peer set: connected peers only. Separate from the
/// `KnownAddressTable`, which tracks every address ever heard of.
#[derive(Default)]
pub struct PeerTable {
    peers: HashMap<PeerId, PeerRecord>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, peer_id: PeerId, remote_addr: String) {
        self.peers.insert(peer_id, PeerRecord { remote_addr, last_seen: now() });
    }

    pub fn touch(&mut self, peer_id: &PeerId) {
        if let Some(record) = self.peers.get_mut(peer_id) {
            record.last_seen = now();
        }
    }

    pub fn remove(&mut self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.keys().copied().collect()
    }

    /// Remote multiaddr strings of every connected peer, for discovery's
    /// own-peer exclusion.
    pub fn remote_addrs(&self) -> Vec<String> {
        self.peers.values().map(|r| r.remote_addr.clone()).collect()
    }

    /// Evict peers whose `last_seen` is older than `staleness_secs`.
    pub fn evict_stale(&mut self, staleness_secs: i64) {
        let cutoff = now() - staleness_secs;
        self.peers.retain(|_, record| record.last_seen >= cutoff);
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

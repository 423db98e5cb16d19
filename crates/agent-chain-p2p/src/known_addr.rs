use std::collections::HashMap;

use agent_chain_core::constants::{
    ADDR_STALE_SECS, QUALITY_EVICT_MAX, QUALITY_INITIAL, QUALITY_ON_FAILURE, QUALITY_ON_SUCCESS,
};
use rand::seq::SliceRandom;

/// One entry in the known-address table, keyed by `host:port` (§4.4).
#[derive(Debug, Clone)]
pub struct KnownAddress {
    pub host: String,
    pub port: u16,
    pub last_seen: i64,
    pub quality_score: i32,
    pub attempt_count: u64,
    pub success_count: u64,
}

impl KnownAddress {
    fn new(host: String, port: u16, quality_score: i32) -> Self {
        Self {
            host,
            port,
            last_seen: now(),
            quality_score,
            attempt_count: 0,
            success_count: 0,
        }
    }

    pub fn key(host: &str, port: u16) -> String {
        format!("{host}:{port}")
    }
}

/// Discovery's address book: separate from the live peer table, tracking
/// reachability history for every address this node has ever heard about.
#[derive(Default)]
pub struct KnownAddressTable {
    entries: HashMap<String, KnownAddress>,
}

impl KnownAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address with the initial quality score if unknown; no-op if
    /// already present (bootstrap seeding and `addr` gossip both call this).
    pub fn seed(&mut self, host: &str, port: u16) {
        let key = KnownAddress::key(host, port);
        self.entries
            .entry(key)
            .or_insert_with(|| KnownAddress::new(host.to_string(), port, QUALITY_INITIAL));
    }

    pub fn get(&self, host: &str, port: u16) -> Option<&KnownAddress> {
        self.entries.get(&KnownAddress::key(host, port))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidates for the discovery loop: not in `exclude`, quality >= the
    /// minimum-candidate threshold, shuffled.
    pub fn candidates(&self, exclude: &[String], min_quality: i32) -> Vec<KnownAddress> {
        let mut candidates: Vec<KnownAddress> = self
            .entries
            .iter()
            .filter(|(key, addr)| !exclude.contains(key) && addr.quality_score >= min_quality)
            .map(|(_, addr)| addr.clone())
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates
    }

    /// Addresses eligible to be shared in an `addr` reply: quality above the
    /// shareable threshold, shuffled, capped at `limit`.
    pub fn shareable(&self, min_quality: i32, limit: usize) -> Vec<KnownAddress> {
        let mut shareable: Vec<KnownAddress> = self
            .entries
            .values()
            .filter(|addr| addr.quality_score > min_quality)
            .cloned()
            .collect();
        shareable.shuffle(&mut rand::thread_rng());
        shareable.truncate(limit);
        shareable
    }

    pub fn record_success(&mut self, host: &str, port: u16) {
        let key = KnownAddress::key(host, port);
        if let Some(addr) = self.entries.get_mut(&key) {
            addr.attempt_count += 1;
            addr.success_count += 1;
            addr.last_seen = now();
            addr.quality_score = (addr.quality_score + QUALITY_ON_SUCCESS).min(100);
        }
    }

    pub fn record_failure(&mut self, host: &str, port: u16) {
        let key = KnownAddress::key(host, port);
        if let Some(addr) = self.entries.get_mut(&key) {
            addr.attempt_count += 1;
            addr.last_seen = now();
            addr.quality_score = (addr.quality_score + QUALITY_ON_FAILURE).max(0);
        }
    }

    /// Evict stale, low-quality addresses (§4.4 maintenance loop).
    pub fn evict_stale(&mut self) {
        let cutoff = now() - ADDR_STALE_SECS;
        self.entries
            .retain(|_, addr| !(addr.last_seen < cutoff && addr.quality_score < QUALITY_EVICT_MAX));
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_idempotent() {
        let mut table = KnownAddressTable::new();
        table.seed("1.2.3.4", 30333);
        table.seed("1.2.3.4", 30333);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn success_raises_quality_failure_lowers_it() {
        let mut table = KnownAddressTable::new();
        table.seed("1.2.3.4", 30333);
        table.record_success("1.2.3.4", 30333);
        assert_eq!(table.get("1.2.3.4", 30333).unwrap().quality_score, QUALITY_INITIAL + QUALITY_ON_SUCCESS);
        table.record_failure("1.2.3.4", 30333);
        assert_eq!(
            table.get("1.2.3.4", 30333).unwrap().quality_score,
            QUALITY_INITIAL + QUALITY_ON_SUCCESS + QUALITY_ON_FAILURE
        );
    }

    #[test]
    fn candidates_exclude_low_quality_and_excluded_keys() {
        let mut table = KnownAddressTable::new();
        table.seed("1.1.1.1", 1);
        table.seed("2.2.2.2", 2);
        for _ in 0..10 {
            table.record_failure("2.2.2.2", 2);
        }
        let candidates = table.candidates(&[], 10);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].host, "1.1.1.1");
    }
}

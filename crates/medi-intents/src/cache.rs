//! Intent Cache (spec.md §4.1 step 2): bounded, deduplicated store of
//! pending intents with a deterministic priority order.
//!
//! Grounded on `chronx-consensus::validator::ValidatorSet`'s `ranked()` —
//! sort-on-read over a `HashMap` rather than a maintained heap — re-purposed
//! from stake ranking to the cycle's candidate-snapshot ordering.

use std::collections::HashMap;

use medi_core::{Intent, IntentHash};

/// Priority-ordered, bounded cache of intents awaiting pairing.
pub struct IntentCache {
    intents: HashMap<IntentHash, Intent>,
    /// Count of candidate pairs each intent is currently involved in —
    /// fewer pending pairs sorts first (spec.md §4.1 step 2).
    pending_pairs: HashMap<IntentHash, u32>,
    capacity: usize,
}

impl IntentCache {
    pub fn new(capacity: usize) -> Self {
        Self { intents: HashMap::new(), pending_pairs: HashMap::new(), capacity }
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn get(&self, hash: &IntentHash) -> Option<&Intent> {
        self.intents.get(hash)
    }

    pub fn contains(&self, hash: &IntentHash) -> bool {
        self.intents.contains_key(hash)
    }

    /// Insert or refresh an intent. Evicts the lowest-priority entry if the
    /// cache is at capacity and `intent` is new.
    pub fn upsert(&mut self, intent: Intent) {
        if !self.intents.contains_key(&intent.hash) && self.intents.len() >= self.capacity {
            if let Some(evict) = self.lowest_priority_hash() {
                self.remove(&evict);
            }
        }
        self.intents.insert(intent.hash, intent);
    }

    pub fn remove(&mut self, hash: &IntentHash) -> Option<Intent> {
        self.pending_pairs.remove(hash);
        self.intents.remove(hash)
    }

    pub fn increment_pending(&mut self, hash: &IntentHash) {
        *self.pending_pairs.entry(*hash).or_insert(0) += 1;
    }

    pub fn decrement_pending(&mut self, hash: &IntentHash) {
        if let Some(count) = self.pending_pairs.get_mut(hash) {
            *count = count.saturating_sub(1);
        }
    }

    fn pending_count(&self, hash: &IntentHash) -> u32 {
        self.pending_pairs.get(hash).copied().unwrap_or(0)
    }

    fn lowest_priority_hash(&self) -> Option<IntentHash> {
        self.ranked().last().map(|i| i.hash)
    }

    /// All cached intents in priority order: fewer pending pairs first,
    /// then older `createdAt`, then lexicographic hash — deterministic to
    /// prevent livelock on identical inputs (spec.md §4.1 step 2).
    pub fn ranked(&self) -> Vec<&Intent> {
        let mut list: Vec<&Intent> = self.intents.values().collect();
        list.sort_by(|a, b| {
            self.pending_count(&a.hash)
                .cmp(&self.pending_count(&b.hash))
                .then(a.created_at.cmp(&b.created_at))
                .then(a.hash.as_bytes().cmp(b.hash.as_bytes()))
        });
        list
    }

    /// Top-N prioritised intents for one alignment-cycle snapshot.
    pub fn snapshot_top_n(&self, n: usize) -> Vec<Intent> {
        self.ranked().into_iter().take(n).cloned().collect()
    }

    /// Drop embedding-cache entries whose intents are no longer cached
    /// (spec.md §4.1 step 8) — returns the hashes still present, for the
    /// caller to diff against its embedding map.
    pub fn cached_hashes(&self) -> Vec<IntentHash> {
        self.intents.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::Author;

    fn intent(hash: u8, created_at: i64) -> Intent {
        Intent {
            hash: IntentHash::from_bytes([hash; 32]),
            author: Author::from("alice"),
            prose: "prose".into(),
            desires: vec![],
            constraints: vec![],
            created_at,
            priority: 0,
        }
    }

    #[test]
    fn ranked_orders_by_pending_pairs_then_age_then_hash() {
        let mut cache = IntentCache::new(10);
        cache.upsert(intent(3, 10));
        cache.upsert(intent(1, 5));
        cache.upsert(intent(2, 5));
        cache.increment_pending(&IntentHash::from_bytes([2; 32]));

        let ranked = cache.ranked();
        let hashes: Vec<u8> = ranked.iter().map(|i| i.hash.as_bytes()[0]).collect();
        // hash 2 has a pending pair so sorts last despite tying on age with hash 1.
        assert_eq!(hashes, vec![1, 3, 2]);
    }

    #[test]
    fn upsert_evicts_lowest_priority_when_full() {
        let mut cache = IntentCache::new(2);
        cache.upsert(intent(1, 1));
        cache.upsert(intent(2, 2));
        cache.upsert(intent(3, 3));
        assert_eq!(cache.len(), 2);
        // 2 is the oldest-among-equal-priority entry once 3 arrives and gets evicted.
        assert!(!cache.contains(&IntentHash::from_bytes([2; 32])));
        assert!(cache.contains(&IntentHash::from_bytes([1; 32])));
        assert!(cache.contains(&IntentHash::from_bytes([3; 32])));
    }
}

//! Vector Index (spec.md §4.2): `(hash -> vector)` with cosine-similarity
//! top-k queries.
//!
//! Flat scan, chosen over HNSW per the resolved Open Question (see
//! SPEC_FULL.md) — the spec requires only determinism of ordering, not a
//! particular algorithm, and a flat scan is trivially deterministic.
//! Snapshot format is a single bincode file, grounded on
//! `chronx-state::db::StateDb`'s open/flush-on-shutdown pattern.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use medi_core::{IntentHash, MediatorError};

#[derive(Serialize, Deserialize, Default)]
struct VectorIndexSnapshot {
    entries: Vec<(IntentHash, Vec<f32>)>,
}

/// Flat cosine-similarity index over intent embeddings.
pub struct VectorIndex {
    vectors: HashMap<IntentHash, Vec<f32>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self { vectors: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn add_or_update(&mut self, hash: IntentHash, vector: Vec<f32>) {
        self.vectors.insert(hash, vector);
    }

    pub fn remove(&mut self, hash: &IntentHash) {
        self.vectors.remove(hash);
    }

    pub fn contains(&self, hash: &IntentHash) -> bool {
        self.vectors.contains_key(hash)
    }

    pub fn get(&self, hash: &IntentHash) -> Option<&Vec<f32>> {
        self.vectors.get(hash)
    }

    /// Drop every entry for which `keep` returns `false` (spec.md §4.1 step
    /// 8: embedding-cache entries whose intents are no longer cached).
    pub fn retain(&mut self, keep: impl Fn(&IntentHash) -> bool) {
        self.vectors.retain(|hash, _| keep(hash));
    }

    /// Top-k nearest neighbours to `query`, excluding anything for which
    /// `filter` returns `false`. Descending by cosine similarity, ties
    /// broken by ascending hash order (spec.md §4.2).
    pub fn top_k(&self, query: &[f32], k: usize, filter: impl Fn(&IntentHash) -> bool) -> Vec<(IntentHash, f32)> {
        let mut scored: Vec<(IntentHash, f32)> = self
            .vectors
            .iter()
            .filter(|(hash, _)| filter(hash))
            .map(|(hash, vec)| (*hash, cosine_similarity(query, vec)))
            .collect();

        scored.sort_by(|(hash_a, sim_a), (hash_b, sim_b)| {
            sim_b
                .partial_cmp(sim_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| hash_a.as_bytes().cmp(hash_b.as_bytes()))
        });
        scored.truncate(k);
        scored
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MediatorError> {
        let snapshot = VectorIndexSnapshot {
            entries: self.vectors.iter().map(|(h, v)| (*h, v.clone())).collect(),
        };
        let bytes = bincode::serialize(&snapshot)?;
        std::fs::write(path, bytes).map_err(|e| MediatorError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Load a snapshot written by `save`. A missing file is not an error —
    /// the index starts empty and the caller rebuilds it by re-embedding
    /// cached intents (spec.md §4.2: "idempotent").
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MediatorError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path).map_err(|e| MediatorError::Storage(e.to_string()))?;
        let snapshot: VectorIndexSnapshot = bincode::deserialize(&bytes)?;
        Ok(Self { vectors: snapshot.entries.into_iter().collect() })
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_orders_by_cosine_descending_with_hash_tiebreak() {
        let mut index = VectorIndex::new();
        index.add_or_update(IntentHash::from_bytes([1; 32]), vec![1.0, 0.0]);
        index.add_or_update(IntentHash::from_bytes([2; 32]), vec![1.0, 0.0]);
        index.add_or_update(IntentHash::from_bytes([3; 32]), vec![0.0, 1.0]);

        let results = index.top_k(&[1.0, 0.0], 2, |_| true);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, IntentHash::from_bytes([1; 32]));
        assert_eq!(results[1].0, IntentHash::from_bytes([2; 32]));
    }

    #[test]
    fn filter_excludes_entries() {
        let mut index = VectorIndex::new();
        let excluded = IntentHash::from_bytes([1; 32]);
        index.add_or_update(excluded, vec![1.0, 0.0]);
        index.add_or_update(IntentHash::from_bytes([2; 32]), vec![0.9, 0.1]);

        let results = index.top_k(&[1.0, 0.0], 5, |h| *h != excluded);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, IntentHash::from_bytes([2; 32]));
    }

    #[test]
    fn retain_drops_entries_not_in_keep_set() {
        let mut index = VectorIndex::new();
        index.add_or_update(IntentHash::from_bytes([1; 32]), vec![1.0]);
        index.add_or_update(IntentHash::from_bytes([2; 32]), vec![2.0]);
        index.retain(|h| *h == IntentHash::from_bytes([1; 32]));
        assert_eq!(index.len(), 1);
        assert!(index.contains(&IntentHash::from_bytes([1; 32])));
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut index = VectorIndex::new();
        index.add_or_update(IntentHash::from_bytes([7; 32]), vec![0.1, 0.2, 0.3]);

        let dir = std::env::temp_dir().join(format!("medi-vector-index-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vector_index.bin");

        index.save(&path).unwrap();
        let reloaded = VectorIndex::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains(&IntentHash::from_bytes([7; 32])));

        std::fs::remove_dir_all(&dir).ok();
    }
}

use serde::{Deserialize, Serialize};

use crate::ids::{Author, IntentHash};

/// The canonical, hashed, human-authored unit of desire flowing through the
/// system (spec.md §3). Immutable once on chain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    pub hash: IntentHash,
    pub author: Author,
    pub prose: String,
    pub desires: Vec<String>,
    pub constraints: Vec<String>,
    /// Unix milliseconds.
    pub created_at: i64,
    /// Higher priority intents are snapshotted first by the Intent Cache.
    pub priority: i64,
}

impl Intent {
    /// Bytes hashed to produce `hash`: `SHA256(prose|author|createdAt)`.
    pub fn hash_input(&self) -> Vec<u8> {
        format!("{}|{}|{}", self.prose, self.author, self.created_at).into_bytes()
    }
}

/// A dense embedding vector. Cached by `IntentHash`; not authoritative
/// persisted state (spec.md §3: "not persisted authoritatively").
pub type Embedding = Vec<f32>;

/// A transient candidate pair produced by one Vector Index query. Exists
/// only within a single alignment-cycle tick (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AlignmentCandidate {
    pub intent_a: IntentHash,
    pub intent_b: IntentHash,
    pub cosine_similarity: f32,
}

impl AlignmentCandidate {
    /// Canonical orientation: `intentHashA < intentHashB` by byte order,
    /// required for work-claim key uniqueness (spec.md §3).
    pub fn canonical(a: IntentHash, b: IntentHash, cosine_similarity: f32) -> Self {
        if a.as_bytes() <= b.as_bytes() {
            Self { intent_a: a, intent_b: b, cosine_similarity }
        } else {
            Self { intent_a: b, intent_b: a, cosine_similarity }
        }
    }

    pub fn key(&self) -> (IntentHash, IntentHash) {
        (self.intent_a, self.intent_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_orders_by_byte_order() {
        let a = IntentHash([1u8; 32]);
        let b = IntentHash([2u8; 32]);
        let c1 = AlignmentCandidate::canonical(b, a, 0.9);
        assert_eq!(c1.intent_a, a);
        assert_eq!(c1.intent_b, b);
    }
}

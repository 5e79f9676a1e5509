use serde::Serialize;
use sha2::{Digest, Sha256};

use medi_core::{Author, IntentHash, MediatorId};

/// Compute SHA-256 of arbitrary bytes (spec.md §3: `hash = SHA256(...)`,
/// the engine's single hashing choke point).
pub fn content_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&out);
    arr
}

/// Derive a `MediatorId` from a raw public-key byte string.
pub fn mediator_id_from_pubkey(pubkey_bytes: &[u8]) -> MediatorId {
    MediatorId(hex::encode(content_hash(pubkey_bytes)))
}

pub fn intent_hash_from_prose(prose: &str, author: &Author, created_at: i64) -> IntentHash {
    let input = format!("{}|{}|{}", prose, author, created_at);
    IntentHash::from_bytes(content_hash(input.as_bytes()))
}

/// Deterministic (sorted-key) canonical JSON bytes of `value`, used
/// everywhere spec.md says "canonical JSON of {...}" — SettlementHash,
/// receiptHash, snapshotHash, packageHash all go through this one
/// function so the hash and the bytes it is computed over always agree.
///
/// `serde_json`'s default map serialization already preserves struct field
/// declaration order, which is stable across builds; we additionally sort
/// any embedded `serde_json::Value` maps so hand-built JSON bodies hash the
/// same way regardless of construction order.
pub fn canonical_json<T: Serialize>(value: &T) -> Vec<u8> {
    let v = serde_json::to_value(value).expect("canonical_json: value must serialize");
    let sorted = sort_json(v);
    serde_json::to_vec(&sorted).expect("canonical_json: sorted value must serialize")
}

fn sort_json(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            for k in keys {
                sorted.insert(k.clone(), sort_json(map[&k].clone()));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}

/// Compute a hash over the canonical JSON of `value`.
pub fn canonical_hash<T: Serialize>(value: &T) -> [u8; 32] {
    content_hash(&canonical_json(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_is_key_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }
}

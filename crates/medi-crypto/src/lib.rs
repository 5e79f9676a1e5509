pub mod hash;
pub mod keypair;

pub use hash::{canonical_hash, canonical_json, content_hash, intent_hash_from_prose, mediator_id_from_pubkey};
pub use keypair::{verify_signature, CryptoError, MediatorKeyPair};

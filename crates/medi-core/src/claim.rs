use serde::{Deserialize, Serialize};

use crate::ids::{ClaimId, IntentHash, MediatorId};

/// A soft, gossiped, time-bounded reservation over an intent pair, used
/// only to reduce duplicate effort (spec.md glossary, §4.4).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkClaim {
    pub claim_id: ClaimId,
    pub mediator_id: MediatorId,
    pub key_a: IntentHash,
    pub key_b: IntentHash,
    pub claimed_at: i64,
    pub expires_at: i64,
}

impl WorkClaim {
    pub fn key(&self) -> (IntentHash, IntentHash) {
        (self.key_a, self.key_b)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

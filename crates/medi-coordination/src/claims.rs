//! Work-Claim table (spec.md §4.4): a soft, gossiped reservation over an
//! intent pair, local to this node. Best-effort only — see spec.md §4.4:
//! "The claim layer is a best-effort optimisation, not a correctness
//! boundary."

use std::collections::HashMap;

use medi_core::{constants::WORK_CLAIM_TTL_SECS, ClaimId, IntentHash, MediatorError, MediatorId, WorkClaim};

/// Local table of work claims, keyed by canonical `(hashA, hashB)`.
#[derive(Default)]
pub struct WorkClaimTable {
    claims: HashMap<(IntentHash, IntentHash), WorkClaim>,
}

fn canonical_key(a: IntentHash, b: IntentHash) -> (IntentHash, IntentHash) {
    if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    }
}

impl WorkClaimTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn load(claims: Vec<WorkClaim>) -> Self {
        let mut table = Self::new();
        for claim in claims {
            table.claims.insert(claim.key(), claim);
        }
        table
    }

    pub fn claims(&self) -> Vec<WorkClaim> {
        self.claims.values().cloned().collect()
    }

    /// Attempt to claim `(a, b)` for `mediator_id`. Re-claiming a key
    /// already held by the same mediator returns the existing claim
    /// unchanged (spec.md §8, testable property 8: idempotent claim).
    pub fn try_claim(
        &mut self,
        claim_id: ClaimId,
        mediator_id: MediatorId,
        a: IntentHash,
        b: IntentHash,
        now: i64,
    ) -> Result<WorkClaim, MediatorError> {
        let key = canonical_key(a, b);

        if let Some(existing) = self.claims.get(&key) {
            if !existing.is_expired(now) {
                if existing.mediator_id == mediator_id {
                    return Ok(existing.clone());
                }
                return Err(MediatorError::conflict(format!(
                    "work claim for {}/{} already held by {}",
                    key.0, key.1, existing.mediator_id
                )));
            }
        }

        let claim = WorkClaim {
            claim_id,
            mediator_id,
            key_a: key.0,
            key_b: key.1,
            claimed_at: now,
            expires_at: now + WORK_CLAIM_TTL_SECS * 1000,
        };
        self.claims.insert(key, claim.clone());
        Ok(claim)
    }

    /// Release a claim, but only if `mediator_id` actually holds it —
    /// releasing someone else's claim is a no-op, never a forced eviction.
    pub fn release(&mut self, a: IntentHash, b: IntentHash, mediator_id: &MediatorId) {
        let key = canonical_key(a, b);
        if let Some(existing) = self.claims.get(&key) {
            if &existing.mediator_id == mediator_id {
                self.claims.remove(&key);
            }
        }
    }

    /// Adopt an incoming gossiped claim, but only when we have no
    /// unexpired claim of our own over the same key (first-claim wins
    /// locally; the chain is the real arbiter on simultaneous claims).
    pub fn observe_remote_claim(&mut self, claim: WorkClaim, now: i64) {
        let key = claim.key();
        let should_adopt = match self.claims.get(&key) {
            None => true,
            Some(existing) => existing.is_expired(now),
        };
        if should_adopt {
            self.claims.insert(key, claim);
        }
    }

    pub fn prune_expired(&mut self, now: i64) {
        self.claims.retain(|_, claim| !claim.is_expired(now));
    }

    pub fn holder(&self, a: IntentHash, b: IntentHash) -> Option<&WorkClaim> {
        self.claims.get(&canonical_key(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(b: u8) -> IntentHash {
        IntentHash::from_bytes([b; 32])
    }

    #[test]
    fn first_claim_succeeds_second_is_refused() {
        let mut table = WorkClaimTable::new();
        let a = hash(1);
        let b = hash(2);
        let mediator1 = MediatorId::from("med1".to_string());
        let mediator2 = MediatorId::from("med2".to_string());

        table.try_claim(ClaimId::from("c1".to_string()), mediator1.clone(), a, b, 1_000).unwrap();
        let result = table.try_claim(ClaimId::from("c2".to_string()), mediator2, a, b, 1_000);
        assert!(result.is_err());
    }

    #[test]
    fn reclaiming_own_key_is_idempotent() {
        let mut table = WorkClaimTable::new();
        let a = hash(1);
        let b = hash(2);
        let mediator = MediatorId::from("med1".to_string());

        let first = table.try_claim(ClaimId::from("c1".to_string()), mediator.clone(), a, b, 1_000).unwrap();
        let second = table.try_claim(ClaimId::from("c2".to_string()), mediator, a, b, 1_000).unwrap();
        assert_eq!(first.claim_id, second.claim_id);
    }

    #[test]
    fn expired_claim_can_be_reclaimed_by_another() {
        let mut table = WorkClaimTable::new();
        let a = hash(1);
        let b = hash(2);
        let mediator1 = MediatorId::from("med1".to_string());
        let mediator2 = MediatorId::from("med2".to_string());

        table.try_claim(ClaimId::from("c1".to_string()), mediator1, a, b, 0).unwrap();
        let later = 10 * WORK_CLAIM_TTL_SECS * 1000;
        let claim = table.try_claim(ClaimId::from("c2".to_string()), mediator2.clone(), a, b, later).unwrap();
        assert_eq!(claim.mediator_id, mediator2);
    }

    #[test]
    fn release_by_non_holder_is_a_no_op() {
        let mut table = WorkClaimTable::new();
        let a = hash(1);
        let b = hash(2);
        let mediator1 = MediatorId::from("med1".to_string());
        let mediator2 = MediatorId::from("med2".to_string());

        table.try_claim(ClaimId::from("c1".to_string()), mediator1, a, b, 1_000).unwrap();
        table.release(a, b, &mediator2);
        assert!(table.holder(a, b).is_some());
    }
}

//! Validator rotation (spec.md §4.1 step 1, §4: "DPoS slot schedule;
//! `shouldMediate()` gate per cycle").
//!
//! Grounded on `chronx-consensus::validator::ValidatorSet` (stake-ranked
//! registry), repurposed from stake-weighted finality voting to a
//! round-robin slot schedule over the ranked set.

use std::collections::HashMap;

use medi_config::ConsensusMode;
use medi_core::MediatorId;

#[derive(Clone, Debug)]
pub struct ValidatorEntry {
    pub mediator_id: MediatorId,
    pub effective_stake: f64,
}

/// Stake-ranked validator registry with round-robin slot assignment.
#[derive(Default)]
pub struct ValidatorRotation {
    validators: HashMap<MediatorId, f64>,
}

impl ValidatorRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stake(&mut self, mediator_id: MediatorId, effective_stake: f64) {
        self.validators.insert(mediator_id, effective_stake);
    }

    pub fn remove(&mut self, mediator_id: &MediatorId) {
        self.validators.remove(mediator_id);
    }

    pub fn effective_stake(&self, mediator_id: &MediatorId) -> f64 {
        self.validators.get(mediator_id).copied().unwrap_or(0.0)
    }

    /// Validators ranked by stake descending, ties broken by id for
    /// determinism (spec.md §4.1: "deterministic, auditable tie-breaking").
    pub fn ranked(&self) -> Vec<ValidatorEntry> {
        let mut list: Vec<ValidatorEntry> = self
            .validators
            .iter()
            .map(|(id, stake)| ValidatorEntry { mediator_id: id.clone(), effective_stake: *stake })
            .collect();
        list.sort_by(|a, b| {
            b.effective_stake
                .partial_cmp(&a.effective_stake)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.mediator_id.cmp(&b.mediator_id))
        });
        list
    }

    /// The mediator authorised to act as primary proposer for the slot
    /// containing `now_ms`, or `None` if no validators are registered.
    pub fn current_slot_holder(&self, now_ms: i64, slot_duration_ms: i64) -> Option<MediatorId> {
        let ranked = self.ranked();
        if ranked.is_empty() || slot_duration_ms <= 0 {
            return None;
        }
        let slot = (now_ms / slot_duration_ms).unsigned_abs() as usize % ranked.len();
        ranked.get(slot).map(|v| v.mediator_id.clone())
    }

    /// Slot gate for one alignment-cycle tick (spec.md §4.1 step 1,
    /// invariant 7: `effectiveStake >= minEffectiveStake` is a
    /// precondition for entering a validator slot).
    pub fn should_mediate(
        &self,
        mediator_id: &MediatorId,
        consensus_mode: ConsensusMode,
        min_effective_stake: f64,
        now_ms: i64,
        slot_duration_ms: i64,
    ) -> bool {
        match consensus_mode {
            ConsensusMode::Permissionless => true,
            ConsensusMode::Poa => self.validators.contains_key(mediator_id),
            ConsensusMode::Dpos | ConsensusMode::Hybrid => {
                if self.effective_stake(mediator_id) < min_effective_stake {
                    return false;
                }
                self.current_slot_holder(now_ms, slot_duration_ms).as_ref() == Some(mediator_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MediatorId {
        MediatorId::from(s.to_string())
    }

    #[test]
    fn permissionless_always_mediates() {
        let rotation = ValidatorRotation::new();
        assert!(rotation.should_mediate(&id("m1"), ConsensusMode::Permissionless, 0.0, 0, 1000));
    }

    #[test]
    fn dpos_gates_on_stake_and_slot() {
        let mut rotation = ValidatorRotation::new();
        rotation.set_stake(id("m1"), 100.0);
        rotation.set_stake(id("m2"), 50.0);

        // below minEffectiveStake: never mediates regardless of slot.
        assert!(!rotation.should_mediate(&id("m2"), ConsensusMode::Dpos, 75.0, 0, 1000));
    }

    #[test]
    fn slot_rotation_is_deterministic_across_ticks() {
        let mut rotation = ValidatorRotation::new();
        rotation.set_stake(id("m1"), 100.0);
        rotation.set_stake(id("m2"), 100.0);

        let holder_a = rotation.current_slot_holder(0, 1000);
        let holder_b = rotation.current_slot_holder(0, 1000);
        assert_eq!(holder_a, holder_b);
    }
}

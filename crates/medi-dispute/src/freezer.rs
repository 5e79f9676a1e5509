//! Evidence Freezer (spec.md §4.7 steps 1 and 3).
//!
//! Grounded on `chronx_recovery::query::RecoveryQuery`'s thin query/mutate
//! wrapper over a keyed store — repurposed here from account-recovery
//! state to dispute freeze state.

use std::collections::HashMap;

use medi_core::{ContestedItemType, DisputeId, FrozenItem, FrozenStatus, MediatorError, SnapshotHash};

#[derive(Default)]
pub struct EvidenceFreezer {
    items: HashMap<String, FrozenItem>,
}

impl EvidenceFreezer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(items: Vec<FrozenItem>) -> Self {
        let mut freezer = Self::new();
        for item in items {
            freezer.items.insert(item.item_id.clone(), item);
        }
        freezer
    }

    pub fn all(&self) -> Vec<FrozenItem> {
        self.items.values().cloned().collect()
    }

    pub fn get(&self, item_id: &str) -> Option<&FrozenItem> {
        self.items.get(item_id)
    }

    pub fn is_frozen(&self, item_id: &str) -> bool {
        matches!(self.items.get(item_id), Some(item) if item.status == FrozenStatus::UnderDispute)
    }

    /// Capture a snapshot of `item_id` and mark it `under_dispute`
    /// (spec.md §4.7 step 1).
    pub fn freeze(
        &mut self,
        item_id: String,
        item_type: ContestedItemType,
        dispute_id: DisputeId,
        snapshot_hash: SnapshotHash,
    ) {
        self.items.insert(
            item_id.clone(),
            FrozenItem {
                item_id,
                item_type,
                dispute_id,
                snapshot_hash,
                status: FrozenStatus::UnderDispute,
                mutation_attempts: 0,
            },
        );
    }

    /// Any write path must call this before mutating `item_id`. Rejects
    /// and records the attempt if the item is currently frozen (spec.md
    /// §4.7 step 1: "Attempts to mutate a frozen item are rejected and
    /// logged in the item's mutationAttempts").
    pub fn guard_mutation(&mut self, item_id: &str) -> Result<(), MediatorError> {
        if let Some(item) = self.items.get_mut(item_id) {
            if item.status == FrozenStatus::UnderDispute {
                item.mutation_attempts += 1;
                return Err(MediatorError::conflict(format!(
                    "{item_id} is frozen under dispute {} and cannot be mutated",
                    item.dispute_id
                )));
            }
        }
        Ok(())
    }

    /// Unfreeze every item belonging to `dispute_id`, but only if the
    /// resolution is non-punitive (spec.md §4.7 step 3); punitive
    /// resolutions keep items frozen pending external enforcement.
    pub fn resolve(&mut self, dispute_id: &DisputeId, punitive: bool) {
        if punitive {
            return;
        }
        for item in self.items.values_mut() {
            if &item.dispute_id == dispute_id {
                item.status = FrozenStatus::DisputeResolved;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_item_rejects_mutation_and_counts_attempts() {
        let mut freezer = EvidenceFreezer::new();
        freezer.freeze(
            "intent-1".into(),
            ContestedItemType::Intent,
            "d1".into(),
            SnapshotHash::from_bytes([1; 32]),
        );
        assert!(freezer.guard_mutation("intent-1").is_err());
        assert!(freezer.guard_mutation("intent-1").is_err());
        assert_eq!(freezer.get("intent-1").unwrap().mutation_attempts, 2);
    }

    #[test]
    fn punitive_resolution_keeps_items_frozen() {
        let mut freezer = EvidenceFreezer::new();
        freezer.freeze(
            "intent-1".into(),
            ContestedItemType::Intent,
            "d1".into(),
            SnapshotHash::from_bytes([1; 32]),
        );
        freezer.resolve(&"d1".into(), true);
        assert!(freezer.is_frozen("intent-1"));
    }

    #[test]
    fn non_punitive_resolution_unfreezes() {
        let mut freezer = EvidenceFreezer::new();
        freezer.freeze(
            "intent-1".into(),
            ContestedItemType::Intent,
            "d1".into(),
            SnapshotHash::from_bytes([1; 32]),
        );
        freezer.resolve(&"d1".into(), false);
        assert!(!freezer.is_frozen("intent-1"));
        assert!(freezer.guard_mutation("intent-1").is_ok());
    }
}

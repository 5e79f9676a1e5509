//! Package Builder (spec.md §4.7): `{dispute, timeline, evidence,
//! clarifications, intents, settlements, receipts}` -> `DisputePackage`
//! with a cryptographic `packageHash` and a completeness check.

use medi_core::{Dispute, DisputeId, DisputePackage, MediatorError, PackageHash, TimelineEventKind};
use medi_crypto::canonical_hash;
use serde::Serialize;

pub struct PackageInputs<'a> {
    pub dispute: &'a Dispute,
    pub evidence_item_ids: Vec<String>,
    pub clarification_ids: Vec<String>,
}

#[derive(Serialize)]
struct Hashable<'a> {
    dispute_id: &'a DisputeId,
    contested_item_ids: &'a [String],
    evidence_item_ids: &'a [String],
    clarification_ids: &'a [String],
}

/// Builds a `DisputePackage`, enforcing the completeness check from
/// spec.md §4.7 before hashing: every contested item must have an
/// evidence entry, and clarification records are required once the
/// dispute has touched `clarifying` or `escalated`.
pub fn build_package(inputs: PackageInputs<'_>, now: i64) -> Result<DisputePackage, MediatorError> {
    let contested_item_ids: Vec<String> =
        inputs.dispute.contested_items.iter().map(|c| c.id.clone()).collect();

    for id in &contested_item_ids {
        if !inputs.evidence_item_ids.contains(id) {
            return Err(MediatorError::validation(format!("contested item {id} has no evidence entry")));
        }
    }

    let touched_clarification = inputs.dispute.timeline.iter().any(|e| {
        matches!(e.kind, TimelineEventKind::ClarificationStarted | TimelineEventKind::Escalated)
    });
    if touched_clarification && inputs.clarification_ids.is_empty() {
        return Err(MediatorError::validation(
            "dispute touched clarifying/escalated but has no clarification records".into(),
        ));
    }

    let hashable = Hashable {
        dispute_id: &inputs.dispute.dispute_id,
        contested_item_ids: &contested_item_ids,
        evidence_item_ids: &inputs.evidence_item_ids,
        clarification_ids: &inputs.clarification_ids,
    };
    let package_hash = PackageHash::from_bytes(canonical_hash(&hashable));

    Ok(DisputePackage {
        dispute_id: inputs.dispute.dispute_id.clone(),
        package_hash,
        contested_item_ids,
        evidence_item_ids: inputs.evidence_item_ids,
        clarification_ids: inputs.clarification_ids,
        built_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle;

    #[test]
    fn rejects_contested_item_with_no_evidence() {
        let dispute = lifecycle::initiate(
            "d1".into(),
            "alice".into(),
            vec![medi_core::ContestedItem { item_type: medi_core::ContestedItemType::Intent, id: "intent-1".into() }],
            0,
        );
        let result = build_package(
            PackageInputs { dispute: &dispute, evidence_item_ids: vec![], clarification_ids: vec![] },
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_clarification_after_escalation() {
        let mut dispute = lifecycle::initiate("d1".into(), "alice".into(), vec![], 0);
        lifecycle::escalate(&mut dispute, 1).unwrap();
        let result = build_package(
            PackageInputs { dispute: &dispute, evidence_item_ids: vec![], clarification_ids: vec![] },
            2,
        );
        assert!(result.is_err());
    }

    #[test]
    fn complete_package_hashes_successfully() {
        let mut dispute = lifecycle::initiate(
            "d1".into(),
            "alice".into(),
            vec![medi_core::ContestedItem { item_type: medi_core::ContestedItemType::Intent, id: "intent-1".into() }],
            0,
        );
        lifecycle::escalate(&mut dispute, 1).unwrap();
        let package = build_package(
            PackageInputs {
                dispute: &dispute,
                evidence_item_ids: vec!["intent-1".into()],
                clarification_ids: vec!["c1".into()],
            },
            2,
        )
        .unwrap();
        assert_eq!(package.dispute_id, dispute.dispute_id);
    }
}

//! Settlement state machine (spec.md §4.5): `proposed -> ratified ->
//! finalized`, with side-edges to `contested` and `reversed`.

use medi_core::{
    Author, Declaration, MediatorError, ProposedSettlement, SettlementStatus,
};
use medi_crypto::canonical_hash;

use crate::validator::{Advisory, SettlementValidator, ValidationContext};

/// Recompute `settlement_hash` from the canonical JSON of the hashable
/// subset (spec.md §3, §4.5: "on every state change the settlementHash is
/// recomputed"). Call after every mutation in this module.
pub fn recompute_hash(settlement: &mut ProposedSettlement) {
    let digest = canonical_hash(&settlement.hashable_fields());
    settlement.settlement_hash = medi_core::SettlementHashId::from_bytes(digest);
}

fn reject_if_immutable(settlement: &ProposedSettlement) -> Result<(), MediatorError> {
    if settlement.immutable {
        return Err(MediatorError::conflict(format!(
            "settlement {} is immutable and cannot be mutated",
            settlement.id
        )));
    }
    Ok(())
}

/// Record one party's declaration (the `proposed -> ratified` precondition
/// accumulates here one declaration at a time; `ratify` checks
/// completeness). Runs `SettlementValidator::validate_declaration`'s
/// blocking/advisory gates before the mechanical checks below, so a
/// declaration against a settlement with unready receipts, an active
/// dispute, or an out-of-order stage never reaches this far (spec.md
/// §4.6).
pub fn declare(
    settlement: &mut ProposedSettlement,
    party: Author,
    human_authorship: bool,
    signature: String,
    now: i64,
    require_human_ratification: bool,
    ctx: &ValidationContext,
) -> Result<Vec<Advisory>, MediatorError> {
    reject_if_immutable(settlement)?;

    if settlement.status != SettlementStatus::Proposed {
        return Err(MediatorError::validation(format!(
            "settlement {} is not in proposed state",
            settlement.id
        )));
    }
    let advisories = SettlementValidator::validate_declaration(settlement, &party, now, ctx).map_err(|(e, risk)| {
        tracing::warn!(settlement = %risk.settlement_id, severity = ?risk.severity, reason = %risk.reason, "settlement declaration blocked");
        e
    })?;
    if settlement.declarations.iter().any(|d| d.party == party) {
        return Err(MediatorError::conflict(format!("{party} has already declared")));
    }
    if require_human_ratification && !human_authorship {
        return Err(MediatorError::validation(format!(
            "{party}'s declaration must assert human authorship"
        )));
    }

    settlement.declarations.push(Declaration { party, human_authorship, signature, declared_at: now });
    recompute_hash(settlement);
    Ok(advisories)
}

/// `proposed -> ratified`: every required party has declared (spec.md
/// §4.5 transition table).
pub fn ratify(settlement: &mut ProposedSettlement, now: i64) -> Result<(), MediatorError> {
    reject_if_immutable(settlement)?;

    if settlement.status != SettlementStatus::Proposed {
        return Err(MediatorError::validation(format!(
            "settlement {} is not in proposed state",
            settlement.id
        )));
    }
    if !settlement.all_declared() {
        return Err(MediatorError::validation("not every required party has declared".into()));
    }

    settlement.status = SettlementStatus::Ratified;
    settlement.ratified_at = Some(now);
    recompute_hash(settlement);
    Ok(())
}

/// `ratified -> finalized`: all stages complete, no active dispute
/// references this settlement's artifacts (checked by the caller and
/// passed in as `has_active_dispute`).
pub fn finalize(
    settlement: &mut ProposedSettlement,
    now: i64,
    has_active_dispute: bool,
) -> Result<(), MediatorError> {
    reject_if_immutable(settlement)?;

    if settlement.status != SettlementStatus::Ratified {
        return Err(MediatorError::validation(format!(
            "settlement {} is not in ratified state",
            settlement.id
        )));
    }
    if !settlement.is_finalizable() {
        return Err(MediatorError::validation("not all stages are complete".into()));
    }
    if has_active_dispute {
        return Err(MediatorError::validation(
            "a referenced artifact has an active dispute".into(),
        ));
    }

    settlement.status = SettlementStatus::Finalized;
    settlement.finalized_at = Some(now);
    settlement.immutable = true;
    recompute_hash(settlement);
    Ok(())
}

/// `proposed|ratified -> contested`. Finalized settlements are not
/// contestable (spec.md §4.5).
pub fn contest(settlement: &mut ProposedSettlement) -> Result<(), MediatorError> {
    match settlement.status {
        SettlementStatus::Proposed | SettlementStatus::Ratified => {
            settlement.status = SettlementStatus::Contested;
            recompute_hash(settlement);
            Ok(())
        }
        SettlementStatus::Finalized => Err(MediatorError::validation(
            "finalized settlements are not contestable".into(),
        )),
        _ => Err(MediatorError::validation(format!(
            "settlement {} cannot be contested from its current state",
            settlement.id
        ))),
    }
}

/// `finalized -> reversed` is a pointer recorded on a *new* settlement,
/// not a mutation of the original (spec.md §4.5). This builds that
/// pointer; the caller still constructs and submits the new settlement
/// through the normal proposal path.
pub fn reversal_of(original: &ProposedSettlement) -> Result<medi_core::SettlementId, MediatorError> {
    if original.status != SettlementStatus::Finalized {
        return Err(MediatorError::validation(format!(
            "settlement {} must be finalized before it can be reversed",
            original.id
        )));
    }
    Ok(original.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::{IntentHash, SettlementHashId, SettlementStage};

    fn settlement() -> ProposedSettlement {
        ProposedSettlement {
            id: "s1".into(),
            intent_hash_a: IntentHash::from_bytes([1; 32]),
            intent_hash_b: IntentHash::from_bytes([2; 32]),
            mediator_id: "m1".into(),
            stake: 0.0,
            prose: "agreement".into(),
            status: SettlementStatus::Proposed,
            required_parties: vec!["alice".into(), "bob".into()],
            declarations: vec![],
            stages: vec![],
            statement: "stmt".into(),
            created_at: 0,
            ratified_at: None,
            finalized_at: None,
            immutable: false,
            reversal_of: None,
            settlement_hash: SettlementHashId::from_bytes([0; 32]),
        }
    }

    fn ready_context() -> ValidationContext {
        ValidationContext { all_receipts_ready: true, has_active_dispute: false, all_licenses_active: true }
    }

    #[test]
    fn forward_transition_through_full_lifecycle() {
        let mut s = settlement();
        declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ready_context()).unwrap();
        declare(&mut s, "bob".into(), true, "sig-b".into(), 2, true, &ready_context()).unwrap();
        ratify(&mut s, 3).unwrap();
        assert_eq!(s.status, SettlementStatus::Ratified);
        finalize(&mut s, 4, false).unwrap();
        assert_eq!(s.status, SettlementStatus::Finalized);
        assert!(s.immutable);
    }

    #[test]
    fn cannot_ratify_with_missing_declarations() {
        let mut s = settlement();
        declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ready_context()).unwrap();
        assert!(ratify(&mut s, 2).is_err());
    }

    #[test]
    fn immutable_settlement_rejects_further_mutation() {
        let mut s = settlement();
        declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ready_context()).unwrap();
        declare(&mut s, "bob".into(), true, "sig-b".into(), 2, true, &ready_context()).unwrap();
        ratify(&mut s, 3).unwrap();
        finalize(&mut s, 4, false).unwrap();
        assert!(contest(&mut s).is_err());
    }

    #[test]
    fn finalized_settlement_is_not_contestable() {
        let mut s = settlement();
        declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ready_context()).unwrap();
        declare(&mut s, "bob".into(), true, "sig-b".into(), 2, true, &ready_context()).unwrap();
        ratify(&mut s, 3).unwrap();
        finalize(&mut s, 4, false).unwrap();
        s.immutable = false; // bypass guard to exercise the state-specific error path
        assert!(contest(&mut s).is_err());
    }

    #[test]
    fn human_authorship_required_when_configured() {
        let mut s = settlement();
        assert!(declare(&mut s, "alice".into(), false, "sig-a".into(), 1, true, &ready_context()).is_err());
    }

    #[test]
    fn finalize_blocked_on_incomplete_stage() {
        let mut s = settlement();
        declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ready_context()).unwrap();
        declare(&mut s, "bob".into(), true, "sig-b".into(), 2, true, &ready_context()).unwrap();
        ratify(&mut s, 3).unwrap();
        s.stages.push(SettlementStage { index: 1, description: "x".into(), completed_at: None });
        assert!(finalize(&mut s, 4, false).is_err());
    }

    #[test]
    fn declare_blocked_when_a_referenced_dispute_is_active() {
        let mut s = settlement();
        let mut ctx = ready_context();
        ctx.has_active_dispute = true;
        assert!(declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ctx).is_err());
    }

    #[test]
    fn declare_surfaces_advisory_for_inactive_license_but_still_succeeds() {
        let mut s = settlement();
        let mut ctx = ready_context();
        ctx.all_licenses_active = false;
        let advisories = declare(&mut s, "alice".into(), true, "sig-a".into(), 1, true, &ctx).unwrap();
        assert_eq!(advisories.len(), 1);
    }
}

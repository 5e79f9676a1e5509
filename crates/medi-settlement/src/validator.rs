//! Settlement Validator (spec.md §4.6): precondition gates run before a
//! declaration is accepted.
//!
//! Grounded on `chronx_dag::validation::validate_vertex`'s ordered,
//! typed-error gate chain — generalised from DAG parent/PoW/signature
//! checks to settlement preconditions. The detailed data models for
//! effort-receipt status, active disputes, and licensing/delegation live
//! in other components — licensing especially is explicitly out of scope
//! per spec.md §1 ("retained only as state transitions... their inner
//! prose-editing UX is not specified") — so this validator is
//! parameterised over those facts via `ValidationContext` rather than
//! reaching across component boundaries.

use medi_core::{Author, MediatorError, ProposedSettlement, RiskSeverity, SettlementRisk};

/// Facts the caller must supply because their authoritative source lives
/// in another component (medi-receipts, medi-dispute) or is out of scope.
pub struct ValidationContext {
    pub all_receipts_ready: bool,
    pub has_active_dispute: bool,
    pub all_licenses_active: bool,
}

/// A non-fatal finding: the declaration is accepted but the caller should
/// surface this to an operator (spec.md §4.6: "advisory... return
/// warning, accept").
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory(pub String);

pub struct SettlementValidator;

impl SettlementValidator {
    /// Runs the gates in spec.md §4.6 order. `Ok` carries any advisory
    /// findings; `Err` carries the blocking error plus the
    /// `SettlementRisk{severity: high}` to record.
    pub fn validate_declaration(
        settlement: &ProposedSettlement,
        party: &Author,
        now: i64,
        ctx: &ValidationContext,
    ) -> Result<Vec<Advisory>, (MediatorError, SettlementRisk)> {
        let mut advisories = Vec::new();

        let blocking = |reason: String| -> (MediatorError, SettlementRisk) {
            (
                MediatorError::validation(reason.clone()),
                SettlementRisk {
                    settlement_id: settlement.id.clone(),
                    severity: RiskSeverity::High,
                    reason,
                    recorded_at: now,
                },
            )
        };

        if !ctx.all_receipts_ready {
            return Err(blocking("a referenced effort receipt is not anchored or verified".into()));
        }
        if ctx.has_active_dispute {
            return Err(blocking("a referenced intent or receipt has an active dispute".into()));
        }
        if !settlement.required_parties.contains(party) {
            return Err(blocking(format!("{party} is not a required party of this settlement")));
        }
        if let Some(reason) = stage_order_violation(settlement) {
            return Err(blocking(reason));
        }

        if !ctx.all_licenses_active {
            advisories.push(Advisory("a referenced license or delegation is not active".into()));
        }

        Ok(advisories)
    }
}

/// Stages must complete strictly in order 1..N with no stage completed
/// twice (spec.md §4.6).
fn stage_order_violation(settlement: &ProposedSettlement) -> Option<String> {
    let mut stages = settlement.stages.clone();
    stages.sort_by_key(|s| s.index);

    let mut expected = 1u32;
    let mut seen_incomplete = false;
    for stage in &stages {
        if stage.index != expected {
            return Some(format!("stage {} is out of order (expected {})", stage.index, expected));
        }
        if stage.completed_at.is_some() {
            if seen_incomplete {
                return Some(format!(
                    "stage {} was completed after an earlier stage was left incomplete",
                    stage.index
                ));
            }
        } else {
            seen_incomplete = true;
        }
        expected += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::{IntentHash, SettlementHashId, SettlementStage, SettlementStatus};

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
    fn non_required_party_is_blocked() {
        let s = settlement();
        let result = SettlementValidator::validate_declaration(&s, &"mallory".into(), 1, &ready_context());
        assert!(result.is_err());
    }

    #[test]
    fn active_dispute_blocks_declaration() {
        let s = settlement();
        let mut ctx = ready_context();
        ctx.has_active_dispute = true;
        let result = SettlementValidator::validate_declaration(&s, &"alice".into(), 1, &ctx);
        assert!(result.is_err());
    }

    #[test]
    fn inactive_license_is_advisory_not_blocking() {
        let s = settlement();
        let mut ctx = ready_context();
        ctx.all_licenses_active = false;
        let result = SettlementValidator::validate_declaration(&s, &"alice".into(), 1, &ctx).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn out_of_order_stage_is_blocking() {
        let mut s = settlement();
        s.stages.push(SettlementStage { index: 2, description: "x".into(), completed_at: None });
        s.stages.push(SettlementStage { index: 1, description: "y".into(), completed_at: Some(1) });
        let result = SettlementValidator::validate_declaration(&s, &"alice".into(), 1, &ready_context());
        assert!(result.is_ok());

        let mut s2 = settlement();
        s2.stages.push(SettlementStage { index: 1, description: "x".into(), completed_at: None });
        s2.stages.push(SettlementStage { index: 2, description: "y".into(), completed_at: Some(1) });
        let result2 = SettlementValidator::validate_declaration(&s2, &"alice".into(), 1, &ready_context());
        assert!(result2.is_err());
    }
}

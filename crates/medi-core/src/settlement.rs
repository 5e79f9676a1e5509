use serde::{Deserialize, Serialize};

use crate::ids::{Author, IntentHash, MediatorId, SettlementHashId, SettlementId};

/// Lifecycle of a proposed settlement (spec.md §3, §4.5).
///
/// Forward transitions only: `Proposed -> Ratified -> Finalized`.
/// `Contested` and `Reversed` are terminal-for-finality side branches.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettlementStatus {
    Proposed,
    Ratified,
    Finalized,
    Contested,
    Reversed,
}

/// One required party's signed affirmation of a settlement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Declaration {
    pub party: Author,
    pub human_authorship: bool,
    pub signature: String,
    pub declared_at: i64,
}

/// One stage of a staged settlement. Stages must complete strictly in
/// order 1..N (spec.md §4.6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SettlementStage {
    pub index: u32,
    pub description: String,
    pub completed_at: Option<i64>,
}

/// A prose agreement binding two intents, produced by this engine and
/// ratified by humans (spec.md glossary).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProposedSettlement {
    pub id: SettlementId,
    /// `intentHashA < intentHashB` by byte order — canonical orientation,
    /// required for work-claim key uniqueness.
    pub intent_hash_a: IntentHash,
    pub intent_hash_b: IntentHash,
    pub mediator_id: MediatorId,
    pub stake: f64,
    pub prose: String,
    pub status: SettlementStatus,
    pub required_parties: Vec<Author>,
    pub declarations: Vec<Declaration>,
    pub stages: Vec<SettlementStage>,
    pub statement: String,
    pub created_at: i64,
    pub ratified_at: Option<i64>,
    pub finalized_at: Option<i64>,
    /// Set once `finalized` or a `Resolution` has been recorded against it;
    /// no field may change afterward (spec.md invariant 3).
    pub immutable: bool,
    /// Points at the settlement this one supersedes, once `finalized ->
    /// reversed`. The original settlement itself is never mutated; this is
    /// a pointer recorded on the *new* settlement.
    pub reversal_of: Option<SettlementId>,
    pub settlement_hash: SettlementHashId,
}

impl ProposedSettlement {
    /// Canonical orientation invariant (spec.md §3).
    pub fn canonical_pair(&self) -> (IntentHash, IntentHash) {
        if self.intent_hash_a.as_bytes() <= self.intent_hash_b.as_bytes() {
            (self.intent_hash_a, self.intent_hash_b)
        } else {
            (self.intent_hash_b, self.intent_hash_a)
        }
    }

    /// True once every `required_parties` entry has a matching declaration.
    pub fn all_declared(&self) -> bool {
        self.required_parties.iter().all(|party| {
            self.declarations.iter().any(|d| &d.party == party)
        })
    }

    /// Staged settlements may be ratified before all stages complete — this
    /// is preserved behaviour (spec.md §9 Open Question), so `status ==
    /// Ratified` does not imply finalizable.
    pub fn is_finalizable(&self) -> bool {
        self.status == SettlementStatus::Ratified
            && self.stages.iter().all(|s| s.completed_at.is_some())
    }

    /// The bytes hashed to produce `settlement_hash`: canonical JSON of
    /// `{id, intent hashes, required parties, declarations, statement,
    /// ratifiedAt, finalizedAt}` (spec.md §3).
    pub fn hashable_fields(&self) -> SettlementHashableFields<'_> {
        SettlementHashableFields {
            id: &self.id,
            intent_hash_a: self.intent_hash_a,
            intent_hash_b: self.intent_hash_b,
            required_parties: &self.required_parties,
            declarations: &self.declarations,
            statement: &self.statement,
            ratified_at: self.ratified_at,
            finalized_at: self.finalized_at,
        }
    }
}

#[derive(Serialize)]
pub struct SettlementHashableFields<'a> {
    pub id: &'a SettlementId,
    pub intent_hash_a: IntentHash,
    pub intent_hash_b: IntentHash,
    pub required_parties: &'a Vec<Author>,
    pub declarations: &'a Vec<Declaration>,
    pub statement: &'a str,
    pub ratified_at: Option<i64>,
    pub finalized_at: Option<i64>,
}

/// High-severity risk recorded whenever a blocking validation failure
/// occurs at settlement initiation time (spec.md §4.6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SettlementRisk {
    pub settlement_id: SettlementId,
    pub severity: RiskSeverity,
    pub reason: String,
    pub recorded_at: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settlement() -> ProposedSettlement {
        ProposedSettlement {
            id: "s1".into(),
            intent_hash_a: IntentHash([1u8; 32]),
            intent_hash_b: IntentHash([2u8; 32]),
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
            settlement_hash: SettlementHashId([0u8; 32]),
        }
    }

    #[test]
    fn all_declared_requires_every_party() {
        let mut s = settlement();
        assert!(!s.all_declared());
        s.declarations.push(Declaration {
            party: "alice".into(),
            human_authorship: true,
            signature: "sig".into(),
            declared_at: 1,
        });
        assert!(!s.all_declared());
        s.declarations.push(Declaration {
            party: "bob".into(),
            human_authorship: true,
            signature: "sig".into(),
            declared_at: 2,
        });
        assert!(s.all_declared());
    }

    #[test]
    fn staged_ratified_not_finalizable_until_stages_complete() {
        let mut s = settlement();
        s.status = SettlementStatus::Ratified;
        s.stages.push(SettlementStage { index: 1, description: "x".into(), completed_at: None });
        assert!(!s.is_finalizable());
        s.stages[0].completed_at = Some(5);
        assert!(s.is_finalizable());
    }
}

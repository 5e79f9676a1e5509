//! Types shared by the Challenge Detector and Semantic Consensus
//! (spec.md §4.9): a contradiction challenge posted against a peer's
//! settlement, a raw spam proof, and a peer-verification request/response
//! pair used by high-value settlement consensus.

use serde::{Deserialize, Serialize};

use crate::ids::{ChallengeId, MediatorId, SettlementId, VerificationRequestId};
use crate::settlement::RiskSeverity;

/// A signed allegation that a peer's settlement contradicts one of its
/// underlying intents.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Challenge {
    pub challenge_id: ChallengeId,
    pub settlement_id: SettlementId,
    pub challenger_mediator_id: MediatorId,
    pub reason: String,
    pub severity: RiskSeverity,
    pub confidence: f64,
    pub submitted_at: i64,
}

/// Raw spam-proof envelope — its wire body is exactly `{proof, prose,
/// signature}`, not the generic `{entry, signature}` shape every other
/// chain endpoint uses.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpamProof {
    pub proof: String,
    pub prose: String,
    pub signature: String,
}

/// A pending semantic-consensus verification request: one peer asking
/// others to paraphrase and approve/reject a high-value settlement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerificationRequest {
    pub request_id: VerificationRequestId,
    pub settlement_id: SettlementId,
    pub requested_by: MediatorId,
    pub requested_at: i64,
    pub deadline_at: i64,
}

/// One verifier's response to a `VerificationRequest`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VerificationResponse {
    pub request_id: VerificationRequestId,
    pub verifier_mediator_id: MediatorId,
    pub summary: String,
    pub approved: bool,
}

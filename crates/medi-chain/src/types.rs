//! Wire types for the chain service's HTTP/JSON interface (spec.md §6).

use serde::{Deserialize, Serialize};

use medi_core::{Challenge, Intent, ProposedSettlement, Resolution, SpamProof, VerificationRequest};

/// Every POST body except spam-proofs is this envelope: `signature =
/// sign(canonicalJSON(entry), mediatorPrivateKey)`.
#[derive(Serialize)]
pub struct SignedEntry<'a, T: Serialize> {
    pub entry: &'a T,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct IntentsResponse {
    pub intents: Vec<Intent>,
}

#[derive(Debug, Deserialize)]
pub struct SettlementsResponse {
    pub settlements: Vec<ProposedSettlement>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitSettlementResponse {
    pub accepted: bool,
    #[serde(rename = "txId")]
    pub tx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BurnResponse {
    pub success: bool,
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeResponse {
    #[serde(rename = "challengeId")]
    pub challenge_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SpamProofResponse {
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequestsResponse {
    pub requests: Vec<VerificationRequest>,
}

pub use medi_core::{BurnRecord as BurnRecordEntry, Deposit as DepositEntry, ProposedSettlement as SettlementEntry};

pub type ChallengeEntry = Challenge;
pub type OutcomeEntry = Resolution;
pub type SpamProofEntry = SpamProof;

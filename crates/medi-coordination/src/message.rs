//! Peer-mesh wire messages (spec.md §4.4, §6) — one `CoordinationMessage`
//! per `POST /api/coordination/message`.

use serde::{Deserialize, Serialize};

use medi_core::{ClaimId, IntentHash, MediatorId, ProposedSettlement};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinationMessage {
    Announce { peer_id: String, endpoint: String, capabilities: Vec<String> },
    Heartbeat { peer_id: String, load: f64 },
    WorkClaim { key_a: IntentHash, key_b: IntentHash, claim_id: ClaimId, mediator_id: MediatorId },
    WorkRelease { key_a: IntentHash, key_b: IntentHash, claim_id: ClaimId },
    SettlementBroadcast { settlement: ProposedSettlement },
    ConsensusRequest { request_id: String, settlement: ProposedSettlement },
    ConsensusResponse { request_id: String, summary: String, approved: bool },
    LoadReport { peer_id: String, load_multiplier: f64 },
}

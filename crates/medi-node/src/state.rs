//! Shared application state: one `Arc<Mutex<_>>` per mutable region named
//! in spec.md §5, built once at startup and cloned into every background
//! task and HTTP handler.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::Mutex;

use medi_burn::{BurnLedger, LoadMonitor};
use medi_chain::ChainClient;
use medi_config::Config;
use medi_coordination::{CoordinationClient, PeerTable, ValidatorRotation, WorkClaimTable};
use medi_core::{Dispute, DisputeId, ProposedSettlement, SettlementId};
use medi_crypto::MediatorKeyPair;
use medi_dispute::EvidenceFreezer;
use medi_intents::{IntentCache, VectorIndex};
use medi_llm::{ContradictionDetector, Embedder, Negotiator, PromptInjectionGuard};

use crate::persistence::PersistenceTrees;

pub struct AppState {
    pub config: Config,
    pub keypair: Arc<MediatorKeyPair>,
    pub chain: Arc<ChainClient>,
    pub coordination: Arc<CoordinationClient>,
    pub embedder: Arc<dyn Embedder>,
    pub negotiator: Arc<dyn Negotiator>,
    pub detector: Arc<dyn ContradictionDetector>,
    pub injection_guard: Arc<PromptInjectionGuard>,

    pub intents: Arc<Mutex<IntentCache>>,
    pub index: Arc<Mutex<VectorIndex>>,
    pub claims: Arc<Mutex<WorkClaimTable>>,
    pub rotation: Arc<Mutex<ValidatorRotation>>,
    pub peers: Arc<Mutex<PeerTable>>,
    pub burn: Arc<Mutex<BurnLedger>>,
    pub load: Arc<Mutex<LoadMonitor>>,
    pub freezer: Arc<Mutex<EvidenceFreezer>>,
    pub challenge_log: Arc<Mutex<medi_challenge::ChallengeLog>>,
    pub settlements: Arc<Mutex<HashMap<SettlementId, ProposedSettlement>>>,
    pub disputes: Arc<Mutex<HashMap<DisputeId, Dispute>>>,

    pub trees: PersistenceTrees,
    pub running: Arc<AtomicBool>,
}

impl AppState {
    pub fn mediator_id(&self) -> medi_core::MediatorId {
        self.keypair.mediator_id.clone()
    }
}

//! Alignment Cycle (spec.md §4.1): the per-tick poll → validate → apply →
//! broadcast loop, generalised from settling blockchain transactions to
//! proposing settlements between intents.
//!
//! Grounded on `chronx-node::main`'s top-level loop: a long-lived engine
//! wrapping shared state behind `Arc`, driven by repeated ticks rather than
//! a channel of inbound transactions (alignment cycles are self-scheduled,
//! not externally fed).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use medi_burn::{today_utc, BurnLedger, LoadMonitor};
use medi_chain::ChainClient;
use medi_config::{BurnConfig, ConsensusMode, CycleConfig, SybilConfig};
use medi_coordination::{ValidatorRotation, WorkClaimTable};
use medi_core::{
    Author, BurnRecordId, BurnType, ClaimId, Deposit, DepositId, DepositStatus, IntentHash, MediatorId,
    ProposedSettlement, SettlementId, SettlementStatus, SpamProof,
};
use medi_intents::{IntentCache, VectorIndex};
use medi_llm::{Embedder, Negotiator, PromptInjectionGuard};

/// A submission ordinal more than this multiple of `dailyFreeLimit` is
/// treated as spam rather than ordinary escalated-burn activity — no
/// concrete threshold is specified beyond "a validated spam-proof forfeits
/// the deposit", so this multiplier is this workspace's resolved choice
/// (see DESIGN.md).
const SPAM_SUBMISSION_MULTIPLE: u32 = 5;

/// Burn/Sybil-resistance collaborators and config the cycle needs to
/// charge filing burn and escrow deposits on every settlement it submits
/// (spec.md §4.3). Bundled into one struct so `AlignmentCycle::new`'s
/// already-long argument list doesn't grow by four more positional params.
pub struct BurnContext {
    pub ledger: Arc<Mutex<BurnLedger>>,
    pub load: Arc<Mutex<LoadMonitor>>,
    pub config: BurnConfig,
    pub sybil: SybilConfig,
    pub sybil_enabled: bool,
}

fn canonical_pair(a: IntentHash, b: IntentHash) -> (IntentHash, IntentHash) {
    if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    }
}

/// What one `tick` accomplished, for the caller's logging/metrics.
#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    /// DPoS is active and this mediator does not hold the current slot.
    NotSlotHolder,
    /// The Intent Cache had nothing to snapshot.
    NoCandidates,
    /// Every candidate pair was claimed by someone else, or negotiation
    /// never cleared `minNegotiationConfidence` within the attempt budget.
    NoViableCandidate,
    Submitted(SettlementId),
    SubmitFailed(SettlementId),
}

/// The per-node alignment cycle: owns no state outright, only shared
/// handles to the tables other components also touch (work claims are
/// also mutated by inbound coordination messages; the validator rotation
/// by peer stake updates).
pub struct AlignmentCycle {
    mediator_id: MediatorId,
    stake: f64,
    chain: Arc<ChainClient>,
    embedder: Arc<dyn Embedder>,
    negotiator: Arc<dyn Negotiator>,
    intents: Arc<Mutex<IntentCache>>,
    index: Arc<Mutex<VectorIndex>>,
    claims: Arc<Mutex<WorkClaimTable>>,
    rotation: Arc<Mutex<ValidatorRotation>>,
    config: CycleConfig,
    consensus_mode: ConsensusMode,
    min_effective_stake: f64,
    burn_ctx: BurnContext,
    settlements: Arc<Mutex<HashMap<SettlementId, ProposedSettlement>>>,
    injection_guard: Arc<PromptInjectionGuard>,
}

impl AlignmentCycle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mediator_id: MediatorId,
        stake: f64,
        chain: Arc<ChainClient>,
        embedder: Arc<dyn Embedder>,
        negotiator: Arc<dyn Negotiator>,
        intents: Arc<Mutex<IntentCache>>,
        index: Arc<Mutex<VectorIndex>>,
        claims: Arc<Mutex<WorkClaimTable>>,
        rotation: Arc<Mutex<ValidatorRotation>>,
        config: CycleConfig,
        consensus_mode: ConsensusMode,
        min_effective_stake: f64,
        burn_ctx: BurnContext,
        settlements: Arc<Mutex<HashMap<SettlementId, ProposedSettlement>>>,
        injection_guard: Arc<PromptInjectionGuard>,
    ) -> Self {
        Self {
            mediator_id,
            stake,
            chain,
            embedder,
            negotiator,
            intents,
            index,
            claims,
            rotation,
            config,
            consensus_mode,
            min_effective_stake,
            burn_ctx,
            settlements,
            injection_guard,
        }
    }

    /// Run one tick. `is_blocked` reports whether an intent's settlements
    /// are currently frozen under dispute or already finalized — that
    /// bookkeeping lives in the settlement/dispute components, so the
    /// cycle only consumes it as a caller-supplied predicate (the same
    /// pattern as `medi_settlement::ValidationContext`'s borrowed facts).
    ///
    /// Never returns an error: every step is caught at its own boundary,
    /// logged, and the cycle proceeds to cleanup regardless (spec.md
    /// §4.1: "A cycle never aborts the engine").
    pub async fn tick(&self, now_ms: i64, is_blocked: impl Fn(&IntentHash) -> bool) -> TickOutcome {
        // Step 1: slot gate. The cycle interval doubles as the slot
        // duration — one tick is one slot.
        {
            let rotation = self.rotation.lock().await;
            if !rotation.should_mediate(
                &self.mediator_id,
                self.consensus_mode,
                self.min_effective_stake,
                now_ms,
                self.config.interval_ms as i64,
            ) {
                return TickOutcome::NotSlotHolder;
            }
        }

        // Step 2: snapshot.
        let snapshot = {
            let intents = self.intents.lock().await;
            intents.snapshot_top_n(self.config.snapshot_n)
        };
        if snapshot.is_empty() {
            self.cleanup().await;
            return TickOutcome::NoCandidates;
        }

        // Step 3: embed anything missing from the index.
        for intent in &snapshot {
            let already_embedded = { self.index.lock().await.contains(&intent.hash) };
            if already_embedded {
                continue;
            }
            match self.embedder.embed(&intent.prose).await {
                Ok(vector) => {
                    self.index.lock().await.add_or_update(intent.hash, vector);
                }
                Err(e) => {
                    tracing::warn!(intent = %intent.hash, error = %e, "embedding failed, skipping intent this cycle");
                }
            }
        }

        // Step 4: candidate search, deduplicated and tie-broken across
        // every snapshotted intent's neighbour query.
        let mut candidates: Vec<(IntentHash, IntentHash, f32)> = Vec::new();
        let mut seen: HashSet<(IntentHash, IntentHash)> = HashSet::new();
        {
            let index = self.index.lock().await;
            for intent in &snapshot {
                let Some(vector) = index.get(&intent.hash).cloned() else { continue };
                let neighbours = index.top_k(&vector, self.config.top_k, |other| {
                    *other != intent.hash && !is_blocked(other)
                });
                for (other, similarity) in neighbours {
                    let pair = canonical_pair(intent.hash, other);
                    if seen.insert(pair) {
                        candidates.push((pair.0, pair.1, similarity));
                    }
                }
            }
        }
        candidates.sort_by(|(a0, a1, sim_a), (b0, b1, sim_b)| {
            sim_b
                .partial_cmp(sim_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a0.as_bytes().cmp(b0.as_bytes()))
                .then_with(|| a1.as_bytes().cmp(b1.as_bytes()))
        });

        // Steps 5-7: attempt claims, negotiate, build & submit.
        let mut negotiated = 0usize;
        let mut outcome = TickOutcome::NoViableCandidate;
        for (a, b, _similarity) in candidates {
            if negotiated >= self.config.max_negotiations {
                break;
            }

            let claim = {
                let mut claims = self.claims.lock().await;
                claims.try_claim(ClaimId::from(Uuid::new_v4().to_string()), self.mediator_id.clone(), a, b, now_ms)
            };
            let Ok(_claim) = claim else { continue };
            negotiated += 1;

            let (intent_a, intent_b) = {
                let intents = self.intents.lock().await;
                (intents.get(&a).cloned(), intents.get(&b).cloned())
            };
            let (Some(intent_a), Some(intent_b)) = (intent_a, intent_b) else {
                self.claims.lock().await.release(a, b, &self.mediator_id);
                continue;
            };

            // Step 5b: reject untrusted prose before it ever reaches the
            // negotiator (spec.md §9's two-layer prompt-injection defence).
            if self.injection_guard.scan(&intent_a.author, &intent_a.prose, now_ms).is_err()
                || self.injection_guard.scan(&intent_b.author, &intent_b.prose, now_ms).is_err()
            {
                tracing::warn!(intent_a = %a, intent_b = %b, "intent prose flagged by the prompt-injection guard, skipping pair");
                self.claims.lock().await.release(a, b, &self.mediator_id);
                continue;
            }

            // Step 6: negotiate.
            let verdict = match self.negotiator.negotiate(&intent_a, &intent_b).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(intent_a = %a, intent_b = %b, error = %e, "negotiation call failed");
                    self.claims.lock().await.release(a, b, &self.mediator_id);
                    continue;
                }
            };
            if !verdict.success || verdict.confidence < self.config.min_negotiation_confidence {
                tracing::debug!(
                    intent_a = %a, intent_b = %b, success = verdict.success, confidence = verdict.confidence,
                    reasoning = %verdict.reasoning, "negotiation did not clear the settlement bar"
                );
                self.claims.lock().await.release(a, b, &self.mediator_id);
                continue;
            }

            // Step 7: build & submit. Release the claim regardless of outcome.
            let settlement = self.build_settlement(a, b, &intent_a, &intent_b, verdict, now_ms);
            let submit_result = self.chain.submit_settlement(&settlement).await;
            self.claims.lock().await.release(a, b, &self.mediator_id);

            outcome = match submit_result {
                Ok(_) => {
                    self.settlements.lock().await.insert(settlement.id.clone(), settlement.clone());
                    self.charge_filing_burn(&intent_a.author, a, now_ms).await;
                    self.charge_filing_burn(&intent_b.author, b, now_ms).await;
                    TickOutcome::Submitted(settlement.id)
                }
                Err(e) => {
                    tracing::warn!(settlement = %settlement.id, error = %e, "settlement submission failed");
                    TickOutcome::SubmitFailed(settlement.id)
                }
            };
            break;
        }

        // Step 8: cleanup.
        self.cleanup().await;
        outcome
    }

    fn build_settlement(
        &self,
        a: IntentHash,
        b: IntentHash,
        intent_a: &medi_core::Intent,
        intent_b: &medi_core::Intent,
        verdict: medi_llm::NegotiationVerdict,
        now_ms: i64,
    ) -> ProposedSettlement {
        let mut settlement = ProposedSettlement {
            id: SettlementId::from(Uuid::new_v4().to_string()),
            intent_hash_a: a,
            intent_hash_b: b,
            mediator_id: self.mediator_id.clone(),
            stake: self.stake,
            prose: format!("{} | {}", intent_a.prose, intent_b.prose),
            status: SettlementStatus::Proposed,
            required_parties: verdict.required_parties.into_iter().map(Author::from).collect(),
            declarations: vec![],
            stages: vec![],
            statement: verdict.statement,
            created_at: now_ms,
            ratified_at: None,
            finalized_at: None,
            immutable: false,
            reversal_of: None,
            settlement_hash: medi_core::SettlementHashId::from_bytes([0u8; 32]),
        };
        medi_settlement::recompute_hash(&mut settlement);
        settlement
    }

    /// Charge filing burn for one author's submission (spec.md §4.3),
    /// escalating to a deposit once they exceed the Sybil-resistance free
    /// limit, and to a spam-proof once they exceed it by
    /// `SPAM_SUBMISSION_MULTIPLE`. Failures talking to the chain are logged
    /// and swallowed — burn accounting never blocks settlement submission.
    async fn charge_filing_burn(&self, author: &Author, intent_hash: IntentHash, now_ms: i64) {
        let today = today_utc();
        let load_multiplier = self.burn_ctx.load.lock().await.lambda();
        let (daily, amount) = self.burn_ctx.ledger.lock().await.record_submission(
            &self.burn_ctx.config,
            load_multiplier,
            true,
            author,
            &today,
            now_ms,
        );
        self.burn_ctx.load.lock().await.record_submission(now_ms, amount);

        if amount > 0.0 {
            let mut record = medi_burn::new_burn_record(
                BurnRecordId::from(Uuid::new_v4().to_string()),
                BurnType::BaseFiling,
                author.clone(),
                amount,
                load_multiplier,
                now_ms,
            );
            record.intent_hash = Some(intent_hash);
            self.burn_ctx.ledger.lock().await.push_record(record.clone());
            if let Err(e) = self.chain.record_burn(&record).await {
                tracing::warn!(author = %author, error = %e, "recording filing burn with the chain failed");
            }
        }

        if !self.burn_ctx.sybil_enabled {
            return;
        }
        let needs_deposit = self.burn_ctx.ledger.lock().await.needs_deposit(&self.burn_ctx.sybil, author, &today);
        if !needs_deposit {
            return;
        }

        if daily.submission_count > self.burn_ctx.sybil.daily_free_limit * SPAM_SUBMISSION_MULTIPLE {
            self.flag_spam(author, &today, daily.submission_count).await;
            return;
        }

        let deposit = Deposit {
            deposit_id: DepositId::from(Uuid::new_v4().to_string()),
            author: author.clone(),
            intent_hash,
            amount: self.burn_ctx.sybil.excess_deposit_amount,
            submitted_at: now_ms,
            refund_deadline: now_ms + self.burn_ctx.sybil.deposit_refund_days * 86_400_000,
            status: DepositStatus::Active,
        };
        match self.chain.submit_deposit(&deposit).await {
            Ok(_) => self.burn_ctx.ledger.lock().await.open_deposit(deposit),
            Err(e) => tracing::warn!(author = %author, error = %e, "submitting deposit failed"),
        }
    }

    async fn flag_spam(&self, author: &Author, today: &str, submission_count: u32) {
        let proof = SpamProof {
            proof: format!("author {author} exceeded {SPAM_SUBMISSION_MULTIPLE}x the daily free submission limit"),
            prose: format!("{submission_count} submissions recorded for {author} on {today}"),
            signature: String::new(),
        };
        let accepted = match self.chain.submit_spam_proof(&proof).await {
            Ok(resp) => resp.accepted,
            Err(e) => {
                tracing::warn!(author = %author, error = %e, "submitting spam proof failed");
                return;
            }
        };
        if !accepted {
            return;
        }
        tracing::warn!(author = %author, "spam proof accepted, forfeiting active deposits");
        let active: Vec<Deposit> = {
            let ledger = self.burn_ctx.ledger.lock().await;
            ledger.deposits().filter(|d| &d.author == author && d.status == DepositStatus::Active).cloned().collect()
        };
        for deposit in active {
            let forfeited = self.burn_ctx.ledger.lock().await.forfeit(&deposit.deposit_id);
            if forfeited {
                if let Err(e) = self.chain.submit_forfeiture(&deposit).await {
                    tracing::warn!(deposit = %deposit.deposit_id, error = %e, "submitting forfeiture failed");
                }
            }
        }
    }

    async fn cleanup(&self) {
        let cached: HashSet<IntentHash> = {
            let intents = self.intents.lock().await;
            intents.cached_hashes().into_iter().collect()
        };
        let mut index = self.index.lock().await;
        index.retain(|hash| cached.contains(hash));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medi_core::{Author, Intent, MediatorError};
    use medi_llm::{NegotiationVerdict, PromptInjectionGuard};

    struct FixedNegotiator {
        confidence: f64,
        success: bool,
    }

    #[async_trait]
    impl Negotiator for FixedNegotiator {
        async fn negotiate(&self, intent_a: &Intent, intent_b: &Intent) -> Result<NegotiationVerdict, MediatorError> {
            Ok(NegotiationVerdict {
                success: self.success,
                confidence: self.confidence,
                statement: format!("settlement of {} and {}", intent_a.author, intent_b.author),
                reasoning: "deterministic test verdict".into(),
                required_parties: vec![intent_a.author.to_string(), intent_b.author.to_string()],
            })
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, prose: &str) -> Result<Vec<f32>, MediatorError> {
            // Deterministic, non-degenerate vector so cosine similarity is well-defined.
            let seed = prose.bytes().map(|b| b as f32).sum::<f32>();
            Ok(vec![seed, 1.0])
        }
    }

    fn intent(id: u8, author: &str) -> Intent {
        Intent {
            hash: IntentHash::from_bytes([id; 32]),
            author: Author::from(author.to_string()),
            prose: format!("intent prose {id}"),
            desires: vec![],
            constraints: vec![],
            created_at: 0,
            priority: 0,
        }
    }

    fn config() -> CycleConfig {
        CycleConfig {
            interval_ms: 30_000,
            vector_dimensions: 2,
            max_intents_cache: 100,
            snapshot_n: 100,
            top_k: 10,
            max_negotiations: 3,
            min_negotiation_confidence: 0.5,
        }
    }

    fn chain_client() -> Arc<ChainClient> {
        let cfg = medi_config::ChainConfig {
            base_url: "http://127.0.0.1:1".into(),
            chain_id: "test".into(),
            bearer_token: None,
            timeout_secs: 1,
            retry_max_attempts: 1,
            retry_base_delay_ms: 1,
        };
        Arc::new(ChainClient::new(cfg, Arc::new(medi_crypto::MediatorKeyPair::generate())).unwrap())
    }

    fn burn_ctx() -> BurnContext {
        BurnContext {
            ledger: Arc::new(Mutex::new(BurnLedger::new())),
            load: Arc::new(Mutex::new(LoadMonitor::new())),
            config: BurnConfig {
                free_daily_submissions: 5,
                base_filing_burn: 1.0,
                escalation_base: 2.0,
                escalation_exponent: 1.5,
                success_burn_percentage: 0.1,
            },
            sybil: SybilConfig { daily_free_limit: 5, excess_deposit_amount: 10.0, deposit_refund_days: 7 },
            sybil_enabled: true,
        }
    }

    fn settlements() -> Arc<Mutex<HashMap<SettlementId, ProposedSettlement>>> {
        Arc::new(Mutex::new(HashMap::new()))
    }

    fn injection_guard() -> Arc<PromptInjectionGuard> {
        Arc::new(PromptInjectionGuard::new(5))
    }

    fn cycle(confidence: f64) -> AlignmentCycle {
        let mut intents = IntentCache::new(100);
        intents.upsert(intent(1, "alice"));
        intents.upsert(intent(2, "bob"));

        AlignmentCycle::new(
            MediatorId::from("me".to_string()),
            10.0,
            chain_client(),
            Arc::new(FixedEmbedder),
            Arc::new(FixedNegotiator { confidence, success: true }),
            Arc::new(Mutex::new(intents)),
            Arc::new(Mutex::new(VectorIndex::new())),
            Arc::new(Mutex::new(WorkClaimTable::new())),
            Arc::new(Mutex::new(ValidatorRotation::new())),
            config(),
            ConsensusMode::Permissionless,
            0.0,
            burn_ctx(),
            settlements(),
            injection_guard(),
        )
    }

    #[tokio::test]
    async fn empty_cache_yields_no_candidates() {
        let empty = AlignmentCycle::new(
            MediatorId::from("me".to_string()),
            10.0,
            chain_client(),
            Arc::new(FixedEmbedder),
            Arc::new(FixedNegotiator { confidence: 0.9, success: true }),
            Arc::new(Mutex::new(IntentCache::new(100))),
            Arc::new(Mutex::new(VectorIndex::new())),
            Arc::new(Mutex::new(WorkClaimTable::new())),
            Arc::new(Mutex::new(ValidatorRotation::new())),
            config(),
            ConsensusMode::Permissionless,
            0.0,
            burn_ctx(),
            settlements(),
            injection_guard(),
        );
        let outcome = empty.tick(0, |_| false).await;
        assert_eq!(outcome, TickOutcome::NoCandidates);
    }

    #[tokio::test]
    async fn dpos_non_slot_holder_is_skipped() {
        let mut rotation = ValidatorRotation::new();
        rotation.set_stake(MediatorId::from("me".to_string()), 1.0);
        rotation.set_stake(MediatorId::from("other".to_string()), 1_000_000.0);

        let mut intents = IntentCache::new(100);
        intents.upsert(intent(1, "alice"));
        intents.upsert(intent(2, "bob"));

        let c = AlignmentCycle::new(
            MediatorId::from("me".to_string()),
            10.0,
            chain_client(),
            Arc::new(FixedEmbedder),
            Arc::new(FixedNegotiator { confidence: 0.9, success: true }),
            Arc::new(Mutex::new(intents)),
            Arc::new(Mutex::new(VectorIndex::new())),
            Arc::new(Mutex::new(WorkClaimTable::new())),
            Arc::new(Mutex::new(rotation)),
            config(),
            ConsensusMode::Dpos,
            0.0,
            burn_ctx(),
            settlements(),
            injection_guard(),
        );
        let outcome = c.tick(0, |_| false).await;
        assert_eq!(outcome, TickOutcome::NotSlotHolder);
    }

    #[tokio::test]
    async fn low_confidence_negotiation_yields_no_viable_candidate() {
        let c = cycle(0.1);
        let outcome = c.tick(0, |_| false).await;
        assert_eq!(outcome, TickOutcome::NoViableCandidate);
    }

    #[tokio::test]
    async fn blocked_pairs_are_excluded_from_candidate_search() {
        let c = cycle(0.9);
        let outcome = c.tick(0, |_| true).await;
        assert_eq!(outcome, TickOutcome::NoViableCandidate);
    }

    #[tokio::test]
    async fn cleanup_drops_embeddings_for_evicted_intents() {
        let c = cycle(0.1);
        let _ = c.tick(0, |_| false).await;
        assert_eq!(c.index.lock().await.len(), 2);
        c.intents.lock().await.remove(&IntentHash::from_bytes([1; 32]));
        c.cleanup().await;
        assert_eq!(c.index.lock().await.len(), 1);
    }
}

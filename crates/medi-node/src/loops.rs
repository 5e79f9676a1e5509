//! The ten independent interval-driven background tasks named in
//! spec.md §5. Each is spawned once from `main`, owns no state beyond a
//! closure-local accumulator where one is needed, and checks
//! `state.running` at the top of every tick so shutdown never has to wait
//! out an in-flight sleep longer than the tick interval itself.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use medi_challenge::{ConsensusOutcome, VerificationTally};
use medi_coordination::CoordinationMessage;
use medi_core::{
    ChallengeId, Deposit, MediatorId, SettlementId, VerificationRequest, VerificationRequestId,
    VerificationResponse,
};
use medi_cycle::AlignmentCycle;

use crate::state::AppState;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// spec.md §4.1: the alignment cycle's own poll → embed → negotiate →
/// submit loop, driven at `config.cycle.interval_ms`.
pub async fn run_alignment_cycle(state: Arc<AppState>, cycle: Arc<AlignmentCycle>) {
    let interval = Duration::from_millis(state.config.cycle.interval_ms);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let frozen = {
            let freezer = state.freezer.lock().await;
            freezer
                .all()
                .iter()
                .filter(|i| {
                    i.status == medi_core::FrozenStatus::UnderDispute
                        && i.item_type == medi_core::ContestedItemType::Intent
                })
                .map(|i| i.item_id.clone())
                .collect::<HashSet<_>>()
        };
        let outcome = cycle
            .tick(now_ms(), |hash| frozen.contains(&hash.to_hex()))
            .await;
        tracing::debug!(?outcome, "alignment cycle tick");
    }
}

/// spec.md §4.1: poll the chain for newly submitted intents and fold them
/// into the local Intent Cache, at the same cadence as the alignment
/// cycle itself. Without this loop the cache only ever reflects the
/// sled snapshot taken at startup.
pub async fn run_intent_poll(state: Arc<AppState>) {
    let interval = Duration::from_millis(state.config.cycle.interval_ms);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let pending = match state.chain.get_pending_intents().await {
            Ok(intents) => intents,
            Err(e) => {
                tracing::warn!(error = %e, "intent poll: fetching pending intents failed");
                continue;
            }
        };
        let mut intents = state.intents.lock().await;
        for intent in pending {
            intents.upsert(intent);
        }
    }
}

/// spec.md §4.3: sliding-window load estimation feeding the burn
/// multiplier every `config.load.monitor_interval_ms`.
pub async fn run_load_monitor(state: Arc<AppState>) {
    let interval = Duration::from_millis(state.config.load.monitor_interval_ms);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let lambda = state.load.lock().await.tick(&state.config.load, now_ms());
        tracing::debug!(lambda, "load monitor tick");
    }
}

/// spec.md §4.9: periodically scan peers' recently submitted settlements
/// for contradictions against their underlying intents and post a
/// challenge to the chain.
pub async fn run_challenge_scan(state: Arc<AppState>) {
    if !state.config.features.enable_challenge_submission {
        tracing::info!("challenge submission disabled, challenge scan loop idle");
        return;
    }
    let interval = Duration::from_secs(60);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let settlements = match state.chain.get_recent_settlements(50).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "challenge scan: fetching recent settlements failed");
                continue;
            }
        };
        for settlement in settlements {
            if settlement.mediator_id == state.mediator_id() {
                continue;
            }
            let already_challenged = state.challenge_log.lock().await.is_challenged(&settlement.id);
            if already_challenged {
                continue;
            }
            let (intent_a, intent_b) = match (
                state.chain.get_intent(&settlement.intent_hash_a).await,
                state.chain.get_intent(&settlement.intent_hash_b).await,
            ) {
                (Ok(a), Ok(b)) => (a, b),
                _ => continue,
            };
            let verdict = match medi_challenge::evaluate_settlement(
                state.detector.as_ref(),
                &settlement.prose,
                &intent_a,
                &intent_b,
                state.config.challenge.min_confidence_to_challenge,
            )
            .await
            {
                Ok(Some(v)) => v,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "contradiction detection failed");
                    continue;
                }
            };
            let challenge = medi_challenge::build_challenge(
                ChallengeId::from(Uuid::new_v4().to_string()),
                settlement.id.clone(),
                state.mediator_id(),
                verdict,
                now_ms(),
            );
            match state.chain.submit_challenge(&challenge).await {
                Ok(_) => {
                    state.challenge_log.lock().await.record(settlement.id.clone());
                    tracing::info!(settlement = %settlement.id, "posted contradiction challenge");
                }
                Err(e) => tracing::warn!(error = %e, "submitting challenge failed"),
            }
        }
    }
}

/// spec.md §4.4: periodically ask a bootstrap peer for its peer directory.
pub async fn run_peer_discovery(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.peer_mesh.discovery_interval_secs);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        for endpoint in &state.config.peer_mesh.bootstrap_peers {
            match state.coordination.discover_peers(endpoint).await {
                Ok(discovered) => {
                    let mut peers = state.peers.lock().await;
                    for peer in discovered {
                        peers.upsert(peer);
                    }
                }
                Err(e) => tracing::debug!(endpoint = %endpoint, error = %e, "peer discovery failed"),
            }
        }
    }
}

/// spec.md §4.4: broadcast this mediator's own liveness and load to every
/// known peer, and evict peers silent for `2 * heartbeat_interval`.
pub async fn run_heartbeat(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.peer_mesh.heartbeat_interval_secs);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let endpoints: Vec<String> = {
            let mut peers = state.peers.lock().await;
            peers.evict_stale(now_ms() / 1000, state.config.peer_mesh.heartbeat_interval_secs as i64);
            peers.all().into_iter().map(|p| p.endpoint).collect()
        };
        let load = state.load.lock().await.lambda();
        let message = CoordinationMessage::Heartbeat { peer_id: state.mediator_id().to_string(), load };
        state.coordination.broadcast(&endpoints, &message).await;
    }
}

/// spec.md §5: a periodic snapshot of engine health, logged rather than
/// pushed to an external metrics sink (none is named in scope).
pub async fn run_monitoring_publisher(state: Arc<AppState>) {
    let interval = Duration::from_secs(30);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let intents = state.intents.lock().await.len();
        let index = state.index.lock().await.len();
        let claims = state.claims.lock().await.len();
        let peers = state.peers.lock().await.len();
        let lambda = state.load.lock().await.lambda();
        tracing::info!(intents, index, claims, peers, lambda, "engine snapshot");
    }
}

/// spec.md §4.9: for this mediator's own settlements above
/// `highValueThreshold`, fan out a semantic-consensus verification request
/// to every known peer and resolve once responses are in.
pub async fn run_settlement_watcher(state: Arc<AppState>) {
    if !state.config.features.enable_semantic_consensus {
        tracing::info!("semantic consensus disabled, settlement watcher loop idle");
        return;
    }
    let interval = Duration::from_secs(60);
    let mut ticker = tokio::time::interval(interval);
    let mut resolved: HashSet<SettlementId> = HashSet::new();
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let settlements = match state.chain.get_recent_settlements(50).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "settlement watcher: fetching recent settlements failed");
                continue;
            }
        };
        let already_pending: HashSet<SettlementId> = match state.chain.get_pending_verification_requests().await {
            Ok(requests) => requests.into_iter().map(|r| r.settlement_id).collect(),
            Err(e) => {
                tracing::debug!(error = %e, "settlement watcher: fetching pending verification requests failed");
                HashSet::new()
            }
        };
        for settlement in settlements {
            if settlement.mediator_id != state.mediator_id() {
                continue;
            }
            if settlement.stake < state.config.challenge.high_value_threshold {
                continue;
            }
            if resolved.contains(&settlement.id) || already_pending.contains(&settlement.id) {
                continue;
            }

            let known_peers = state.peers.lock().await.all();
            let endpoints: Vec<String> = known_peers.iter().map(|p| p.endpoint.clone()).collect();
            let peer_ids: Vec<MediatorId> = known_peers.into_iter().map(|p| MediatorId::from(p.peer_id)).collect();

            let request = VerificationRequest {
                request_id: VerificationRequestId::from(Uuid::new_v4().to_string()),
                settlement_id: settlement.id.clone(),
                requested_by: state.mediator_id(),
                requested_at: now_ms(),
                deadline_at: now_ms() + state.config.consensus.verification_deadline_hours * 3_600_000,
            };
            let mut tally = VerificationTally::new(request);

            for (endpoint, verifier) in endpoints.iter().zip(peer_ids.iter()) {
                match state.coordination.request_consensus(endpoint, &settlement).await {
                    Ok(verdict) => {
                        tally.record(VerificationResponse {
                            request_id: tally.request.request_id.clone(),
                            verifier_mediator_id: verifier.clone(),
                            summary: verdict.summary,
                            approved: verdict.approved,
                        });
                    }
                    Err(e) => tracing::debug!(endpoint = %endpoint, error = %e, "consensus request failed"),
                }
            }

            match medi_challenge::resolve(
                state.embedder.as_ref(),
                &tally,
                now_ms() + 1,
                state.config.consensus.required_consensus,
                state.config.consensus.semantic_similarity_threshold,
            )
            .await
            {
                Ok(ConsensusOutcome::Accepted) => {
                    tracing::info!(settlement = %settlement.id, "semantic consensus accepted");
                    resolved.insert(settlement.id.clone());
                }
                Ok(ConsensusOutcome::Rejected(reason)) => {
                    tracing::warn!(settlement = %settlement.id, reason, "semantic consensus rejected");
                    resolved.insert(settlement.id.clone());
                }
                Err(e) => tracing::debug!(settlement = %settlement.id, error = %e, "consensus not yet resolvable"),
            }
        }
    }
}

/// spec.md §4.7: periodically persist the Evidence Freezer's state so a
/// restart re-hydrates exactly which items are frozen under dispute.
pub async fn run_dispute_freezer_sweep(state: Arc<AppState>) {
    if !state.config.features.enable_dispute_system {
        tracing::info!("dispute system disabled, freezer sweep loop idle");
        return;
    }
    let interval = Duration::from_secs(120);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let items = state.freezer.lock().await.all();
        if let Err(e) = state.trees.save_frozen_items(&items) {
            tracing::warn!(error = %e, "persisting frozen items failed");
        }
    }
}

/// spec.md §4.3: refund every active deposit whose `refundDeadline` has
/// passed, recording the result with the chain.
pub async fn run_deposit_refund_sweep(state: Arc<AppState>) {
    if !state.config.features.enable_sybil_resistance {
        tracing::info!("sybil resistance disabled, deposit refund sweep loop idle");
        return;
    }
    let interval = Duration::from_secs(3600);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if !state.running.load(Ordering::SeqCst) {
            return;
        }
        let expired: Vec<Deposit> = state.burn.lock().await.expired_active_deposits(now_ms());
        for deposit in expired {
            match state.chain.submit_refund(&deposit).await {
                Ok(_) => {
                    state.burn.lock().await.mark_refunded(&deposit.deposit_id);
                    tracing::info!(deposit = %deposit.deposit_id, "deposit refunded");
                }
                Err(e) => tracing::warn!(deposit = %deposit.deposit_id, error = %e, "deposit refund failed"),
            }
        }
    }
}

//! medi-node — the mediator binary.
//!
//! Startup sequence (spec.md §4, §6):
//!   1. Load config from the environment
//!   2. Load or generate this mediator's Ed25519 identity
//!   3. Open the state database and re-hydrate every shared-state region
//!   4. Build the chain/coordination clients and LLM collaborators
//!   5. Spawn the ten background loops and the peer-mesh HTTP server
//!   6. Wait for Ctrl-C, flush state, and shut down within
//!      `maxShutdownDelaySecs`
//!
//! Grounded on `chronx-node::main`'s shape (`tracing_subscriber::fmt` init,
//! `clap::Parser`, one `tokio::spawn` per long-lived task) with the
//! genesis/P2P/RPC-specific steps replaced by this engine's own
//! rehydrate-then-spawn sequence.

mod http;
mod loops;
mod persistence;
mod state;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::{info, warn};

use medi_burn::{BurnLedger, LoadMonitor};
use medi_chain::ChainClient;
use medi_config::Config;
use medi_coordination::{CoordinationClient, PeerTable, ValidatorRotation, WorkClaimTable};
use medi_core::MediatorError;
use medi_crypto::MediatorKeyPair;
use medi_cycle::AlignmentCycle;
use medi_dispute::EvidenceFreezer;
use medi_intents::{IntentCache, VectorIndex};
use medi_llm::{ContradictionDetector, Embedder, Negotiator, PromptInjectionGuard};

use crate::persistence::PersistenceTrees;
use crate::state::AppState;

const COORDINATION_BROADCAST_TIMEOUT_SECS: u64 = medi_core::constants::PEER_BROADCAST_TIMEOUT_SECS;

#[derive(Parser, Debug)]
#[command(name = "medi-node", version, about = "Mediator node — alignment, settlement and anti-spam engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the mediator node, reading all configuration from the environment.
    Start,
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,medi=debug".parse().unwrap()),
        )
        .init();

    let _cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return std::process::ExitCode::from(2);
        }
    };

    let state = match runtime.block_on(startup()) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "startup failed");
            return std::process::ExitCode::from(1);
        }
    };

    match runtime.block_on(run(state)) {
        Ok(()) => std::process::ExitCode::from(0),
        Err(e) => {
            warn!(error = %e, "node exited with a fatal runtime error");
            std::process::ExitCode::from(2)
        }
    }
}

/// Phase 1: everything that can fail with a *configuration* error —
/// mapped to exit code 1 (spec.md §6).
async fn startup() -> Result<Arc<AppState>, MediatorError> {
    let config = Config::from_env()?;
    info!(data_dir = %config.data_dir.display(), "mediator node starting");

    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| MediatorError::config(format!("creating data dir {}: {e}", config.data_dir.display())))?;

    let keypair = MediatorKeyPair::load_or_generate(&config.keypair_path)
        .map_err(|e| MediatorError::config(format!("loading mediator identity: {e}")))?;
    info!(mediator_id = %keypair.mediator_id, "mediator identity loaded");
    let keypair = Arc::new(keypair);

    let db = medi_core::store::open_db(&config.data_dir)?;
    let trees = PersistenceTrees::open(&db)?;

    let mut intents = IntentCache::new(config.cycle.max_intents_cache);
    for intent in trees.load_intents() {
        intents.upsert(intent);
    }

    let index_path = config.data_dir.join("vector_index.bin");
    let index = VectorIndex::load(&index_path)?;

    let claims = WorkClaimTable::load(trees.load_claims());
    let peers = PeerTable::load(trees.load_peers());

    let mut rotation = ValidatorRotation::new();
    for (mediator_id, stake) in trees.load_validators() {
        rotation.set_stake(medi_core::MediatorId::from(mediator_id), stake);
    }

    let burn = BurnLedger::load(trees.load_burn_daily(), trees.load_burn_history(), trees.load_deposits());
    let load = LoadMonitor::new();
    let freezer = EvidenceFreezer::load(trees.load_frozen_items());
    let challenge_log = medi_challenge::ChallengeLog::new();

    let settlements: HashMap<_, _> =
        trees.load_settlements().into_iter().map(|s| (s.id.clone(), s)).collect();
    let disputes: HashMap<_, _> =
        trees.load_disputes().into_iter().map(|d| (d.dispute_id.clone(), d)).collect();

    let chain = Arc::new(ChainClient::new(config.chain.clone(), Arc::clone(&keypair))?);
    let coordination = Arc::new(CoordinationClient::new(COORDINATION_BROADCAST_TIMEOUT_SECS)?);

    let embedder: Arc<dyn Embedder> = Arc::new(medi_llm::StubEmbedder::new(config.cycle.vector_dimensions));
    let negotiator: Arc<dyn Negotiator> = Arc::new(medi_llm::StubNegotiator::default());
    let detector: Arc<dyn ContradictionDetector> = Arc::new(medi_llm::StubContradictionDetector);
    let injection_guard = Arc::new(PromptInjectionGuard::new(config.effort.injection_rate_limit_threshold));

    Ok(Arc::new(AppState {
        config,
        keypair,
        chain,
        coordination,
        embedder,
        negotiator,
        detector,
        injection_guard,
        intents: Arc::new(Mutex::new(intents)),
        index: Arc::new(Mutex::new(index)),
        claims: Arc::new(Mutex::new(claims)),
        rotation: Arc::new(Mutex::new(rotation)),
        peers: Arc::new(Mutex::new(peers)),
        burn: Arc::new(Mutex::new(burn)),
        load: Arc::new(Mutex::new(load)),
        freezer: Arc::new(Mutex::new(freezer)),
        challenge_log: Arc::new(Mutex::new(challenge_log)),
        settlements: Arc::new(Mutex::new(settlements)),
        disputes: Arc::new(Mutex::new(disputes)),
        trees,
        running: Arc::new(AtomicBool::new(true)),
    }))
}

/// Phase 2: spawn every background task and the HTTP server, then block
/// on shutdown. Any failure here is a fatal runtime error (exit code 2).
async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let own_stake = state.rotation.lock().await.effective_stake(&state.mediator_id());

    let burn_ctx = medi_cycle::BurnContext {
        ledger: Arc::clone(&state.burn),
        load: Arc::clone(&state.load),
        config: state.config.burn.clone(),
        sybil: state.config.sybil.clone(),
        sybil_enabled: state.config.features.enable_sybil_resistance,
    };

    let cycle = Arc::new(AlignmentCycle::new(
        state.mediator_id(),
        own_stake,
        Arc::clone(&state.chain),
        Arc::clone(&state.embedder),
        Arc::clone(&state.negotiator),
        Arc::clone(&state.intents),
        Arc::clone(&state.index),
        Arc::clone(&state.claims),
        Arc::clone(&state.rotation),
        state.config.cycle.clone(),
        state.config.coordination.consensus_mode,
        state.config.coordination.min_effective_stake,
        burn_ctx,
        Arc::clone(&state.settlements),
        Arc::clone(&state.injection_guard),
    ));

    let mut handles = Vec::new();
    handles.push(tokio::spawn(loops::run_alignment_cycle(Arc::clone(&state), cycle)));
    handles.push(tokio::spawn(loops::run_intent_poll(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_load_monitor(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_challenge_scan(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_peer_discovery(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_heartbeat(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_monitoring_publisher(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_settlement_watcher(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_dispute_freezer_sweep(Arc::clone(&state))));
    handles.push(tokio::spawn(loops::run_deposit_refund_sweep(Arc::clone(&state))));

    let server_state = Arc::clone(&state);
    let server = tokio::spawn(async move { http::run_server(server_state).await });

    info!(listen_addr = %state.config.peer_mesh.listen_addr, "mediator node ready");

    tokio::signal::ctrl_c().await.map_err(|e| anyhow::anyhow!("waiting on ctrl-c: {e}"))?;
    info!("shutdown signal received, draining");
    state.running.store(false, Ordering::SeqCst);

    let max_delay = Duration::from_secs(state.config.max_shutdown_delay_secs);
    if tokio::time::timeout(max_delay, futures::future::join_all(handles)).await.is_err() {
        warn!("background loops did not drain within the shutdown window, flushing anyway");
    }
    server.abort();

    flush(&state).await?;
    info!("mediator node shut down cleanly");
    Ok(())
}

/// Persist every shared-state region on the way out (spec.md §5: "flush
/// state before abandoning in-flight network calls").
async fn flush(state: &AppState) -> anyhow::Result<()> {
    let intents: Vec<_> = state.intents.lock().await.ranked().into_iter().cloned().collect();
    state.trees.save_intents(&intents)?;

    let index_path = state.config.data_dir.join("vector_index.bin");
    state.index.lock().await.save(&index_path)?;

    state.trees.save_claims(&state.claims.lock().await.claims())?;
    state.trees.save_peers(&state.peers.lock().await.all())?;

    let validators: Vec<(String, f64)> = state
        .rotation
        .lock()
        .await
        .ranked()
        .into_iter()
        .map(|v| (v.mediator_id.to_string(), v.effective_stake))
        .collect();
    state.trees.save_validators(&validators)?;

    let burn = state.burn.lock().await;
    let daily: Vec<_> = burn.daily().cloned().collect();
    let deposits: Vec<_> = burn.deposits().cloned().collect();
    state.trees.save_burn_daily(&daily)?;
    state.trees.save_burn_history(burn.history())?;
    state.trees.save_deposits(&deposits)?;
    drop(burn);

    state.trees.save_frozen_items(&state.freezer.lock().await.all())?;

    let settlements: Vec<_> = state.settlements.lock().await.values().cloned().collect();
    state.trees.save_settlements(&settlements)?;
    let disputes: Vec<_> = state.disputes.lock().await.values().cloned().collect();
    state.trees.save_disputes(&disputes)?;
    Ok(())
}

//! Peer-mesh HTTP server (spec.md §4.4, §4.9, §6), plus the
//! settlement/dispute lifecycle routes that give `declare`/`ratify`/
//! `finalize`/dispute resolution a runtime caller (see DESIGN.md).
//!
//! Grounded on `PolyTorus-polytorus`'s `src/webapi` module — `actix-web`
//! with an origin-allow-listed `actix-cors` layer, one handler per
//! route, app data shared via `web::Data<Arc<AppState>>` — since
//! chronx's own RPC surface (`jsonrpsee`) has no vehicle for spec.md
//! §6's literal REST paths.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medi_coordination::CoordinationMessage;
use medi_core::{
    Author, ContestedItem, MediatorError, Peer, Resolution, ResolutionId, ResolutionOutcome, SettlementId,
};
use medi_dispute::lifecycle as dispute_lifecycle;
use medi_llm::{ContradictionDetector, SectionBuilder};
use medi_settlement::ValidationContext;

use crate::state::AppState;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn post_message(
    state: web::Data<Arc<AppState>>,
    message: web::Json<CoordinationMessage>,
) -> HttpResponse {
    match message.into_inner() {
        CoordinationMessage::Announce { peer_id, endpoint, capabilities } => {
            let mut peers = state.peers.lock().await;
            peers.upsert(Peer {
                peer_id,
                endpoint,
                last_seen: now_ms() / 1000,
                reputation: 1.0,
                load: 0.0,
                capabilities,
            });
        }
        CoordinationMessage::Heartbeat { peer_id, load } => {
            state.peers.lock().await.heartbeat(&peer_id, load, now_ms() / 1000);
        }
        CoordinationMessage::WorkClaim { key_a, key_b, claim_id, mediator_id } => {
            let now = now_ms();
            let claim = medi_core::WorkClaim {
                claim_id,
                mediator_id,
                key_a,
                key_b,
                claimed_at: now,
                expires_at: now + medi_core::constants::WORK_CLAIM_TTL_SECS * 1000,
            };
            state.claims.lock().await.observe_remote_claim(claim, now);
        }
        CoordinationMessage::WorkRelease { key_a, key_b, claim_id } => {
            let mut claims = state.claims.lock().await;
            if let Some(holder) = claims.holder(key_a, key_b) {
                if holder.claim_id == claim_id {
                    let mediator_id = holder.mediator_id.clone();
                    claims.release(key_a, key_b, &mediator_id);
                }
            }
        }
        CoordinationMessage::SettlementBroadcast { settlement } => {
            tracing::debug!(settlement = %settlement.id, "received settlement broadcast");
        }
        CoordinationMessage::ConsensusRequest { request_id, .. } => {
            tracing::debug!(request_id, "received consensus request over the message channel, ignoring — use /api/coordination/consensus");
        }
        CoordinationMessage::ConsensusResponse { request_id, .. } => {
            tracing::debug!(request_id, "received consensus response over the message channel, ignoring — use /api/coordination/consensus");
        }
        CoordinationMessage::LoadReport { peer_id, load_multiplier } => {
            state.peers.lock().await.heartbeat(&peer_id, load_multiplier, now_ms() / 1000);
        }
    }
    HttpResponse::Ok().finish()
}

async fn get_peers(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let peers = state.peers.lock().await.all();
    HttpResponse::Ok().json(peers)
}

#[derive(Serialize)]
struct ConsensusResponseBody {
    summary: String,
    approved: bool,
}

/// `POST /api/coordination/consensus`: another mediator asks us to verify
/// one of its own high-value settlements (spec.md §4.9 paragraph 2).
async fn post_consensus(
    state: web::Data<Arc<AppState>>,
    settlement: web::Json<medi_core::ProposedSettlement>,
) -> HttpResponse {
    let settlement = settlement.into_inner();
    let verdict = match verify_settlement(&state, &settlement).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(settlement = %settlement.id, error = %e, "consensus verification failed");
            return HttpResponse::InternalServerError().finish();
        }
    };
    HttpResponse::Ok().json(ConsensusResponseBody { summary: verdict.0, approved: verdict.1 })
}

async fn verify_settlement(
    state: &AppState,
    settlement: &medi_core::ProposedSettlement,
) -> Result<(String, bool), MediatorError> {
    let author = Author::from(settlement.mediator_id.to_string());
    state.injection_guard.scan(&author, &settlement.prose, now_ms())?;

    let intent_a = state.chain.get_intent(&settlement.intent_hash_a).await?;
    let intent_b = state.chain.get_intent(&settlement.intent_hash_b).await?;
    let wrapped_prose = SectionBuilder::build(
        "Decide whether this settlement's prose contradicts either underlying intent.",
        &[("SETTLEMENT_PROSE", &settlement.prose)],
    );
    let verdict = state.detector.detect(&wrapped_prose, &intent_a, &intent_b).await?;
    if verdict.contradicts {
        return Ok((verdict.reason, false));
    }
    Ok((format!("no contradiction found: {}", verdict.reason), true))
}

#[derive(Deserialize)]
struct DeclareRequest {
    party: Author,
    human_authorship: bool,
    signature: String,
}

/// `POST /api/settlements/{id}/declare`: record one party's declaration
/// against a proposed settlement, ratifying it once every required party
/// has declared. Not a literal spec.md §6 route — this workspace's
/// resolution of how `declare`/`ratify` are driven at runtime rather than
/// only from unit tests (see DESIGN.md).
async fn post_declare(
    state: web::Data<Arc<AppState>>,
    path: web::Path<SettlementId>,
    body: web::Json<DeclareRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    let body = body.into_inner();
    let mut settlements = state.settlements.lock().await;
    let Some(settlement) = settlements.get_mut(&id) else {
        return HttpResponse::NotFound().finish();
    };

    let has_active_dispute = {
        let freezer = state.freezer.lock().await;
        freezer.is_frozen(&id.to_string())
    };
    let ctx = ValidationContext { all_receipts_ready: true, has_active_dispute, all_licenses_active: true };

    let now = now_ms();
    let advisories = match medi_settlement::declare(
        settlement,
        body.party,
        body.human_authorship,
        body.signature,
        now,
        state.config.settlement.require_human_ratification,
        &ctx,
    ) {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!(settlement = %id, error = %e, "settlement declaration rejected");
            return HttpResponse::BadRequest().json(e.to_string());
        }
    };

    if settlement.all_declared() {
        if let Err(e) = medi_settlement::ratify(settlement, now) {
            tracing::warn!(settlement = %id, error = %e, "ratification failed after every party declared");
        }
    }

    if let Err(e) = state.chain.submit_settlement(settlement).await {
        tracing::warn!(settlement = %id, error = %e, "re-submitting declared settlement to the chain failed");
    }

    HttpResponse::Ok().json(advisories.into_iter().map(|a| a.0).collect::<Vec<_>>())
}

/// `POST /api/settlements/{id}/finalize`: finalize a ratified settlement
/// and charge the success burn. `settlement.stake` stands in for the
/// settlement's value, since no `settlementValue` field is modeled
/// elsewhere (resolved Open Question, see DESIGN.md).
async fn post_finalize(state: web::Data<Arc<AppState>>, path: web::Path<SettlementId>) -> HttpResponse {
    let id = path.into_inner();
    let mut settlements = state.settlements.lock().await;
    let Some(settlement) = settlements.get_mut(&id) else {
        return HttpResponse::NotFound().finish();
    };

    let has_active_dispute = {
        let freezer = state.freezer.lock().await;
        freezer.is_frozen(&id.to_string())
    };
    let now = now_ms();
    if let Err(e) = medi_settlement::finalize(settlement, now, has_active_dispute) {
        tracing::warn!(settlement = %id, error = %e, "settlement finalization rejected");
        return HttpResponse::BadRequest().json(e.to_string());
    }

    let amount = medi_burn::success_burn(&state.config.burn, settlement.stake);
    if amount > 0.0 {
        let load_multiplier = state.load.lock().await.lambda();
        let mut record = medi_burn::new_burn_record(
            medi_core::BurnRecordId::from(Uuid::new_v4().to_string()),
            medi_core::BurnType::Success,
            settlement.mediator_id.to_string().into(),
            amount,
            load_multiplier,
            now,
        );
        record.settlement_id = Some(settlement.id.to_string());
        state.burn.lock().await.push_record(record.clone());
        if let Err(e) = state.chain.record_burn(&record).await {
            tracing::warn!(settlement = %id, error = %e, "recording success burn with the chain failed");
        }
    }

    if let Err(e) = state.chain.submit_settlement(settlement).await {
        tracing::warn!(settlement = %id, error = %e, "re-submitting finalized settlement to the chain failed");
    }

    HttpResponse::Ok().finish()
}

#[derive(Deserialize)]
struct InitiateDisputeRequest {
    claimant: Author,
    contested_items: Vec<ContestedItem>,
}

/// `POST /api/disputes`: open a dispute and freeze every contested item
/// (spec.md §4.7 steps 1-2). Not a literal spec.md §6 route — see
/// DESIGN.md.
async fn post_initiate_dispute(
    state: web::Data<Arc<AppState>>,
    body: web::Json<InitiateDisputeRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let now = now_ms();
    let dispute_id = medi_core::DisputeId::from(Uuid::new_v4().to_string());
    let dispute = dispute_lifecycle::initiate(dispute_id.clone(), body.claimant, body.contested_items.clone(), now);

    {
        let mut freezer = state.freezer.lock().await;
        for item in &body.contested_items {
            let snapshot = medi_core::SnapshotHash::from_bytes(medi_crypto::canonical_hash(item));
            freezer.freeze(item.id.clone(), item.item_type, dispute_id.clone(), snapshot);
        }
    }

    state.disputes.lock().await.insert(dispute.dispute_id.clone(), dispute);
    HttpResponse::Ok().json(dispute_id.to_string())
}

#[derive(Deserialize)]
struct ResolveDisputeRequest {
    outcome: ResolutionOutcome,
}

/// `POST /api/disputes/{id}/resolve`: record a dispute's resolution,
/// unfreeze its non-punitive items, and write the immutable outcome to
/// the chain (spec.md §4.7 step 3).
async fn post_resolve_dispute(
    state: web::Data<Arc<AppState>>,
    path: web::Path<medi_core::DisputeId>,
    body: web::Json<ResolveDisputeRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    let outcome = body.into_inner().outcome;
    let now = now_ms();

    {
        let mut disputes = state.disputes.lock().await;
        let Some(dispute) = disputes.get_mut(&id) else {
            return HttpResponse::NotFound().finish();
        };
        if let Err(e) = dispute_lifecycle::resolve(dispute, now) {
            tracing::warn!(dispute = %id, error = %e, "dispute resolution rejected");
            return HttpResponse::BadRequest().json(e.to_string());
        }
    }

    state.freezer.lock().await.resolve(&id, outcome.is_punitive());

    let resolution = Resolution {
        resolution_id: ResolutionId::from(Uuid::new_v4().to_string()),
        dispute_id: id.clone(),
        outcome,
        is_immutable: true,
        recorded_at: now,
    };
    if let Err(e) = state.chain.record_outcome(&resolution).await {
        tracing::warn!(dispute = %id, error = %e, "recording dispute outcome with the chain failed");
    }

    HttpResponse::Ok().finish()
}

pub async fn run_server(state: Arc<AppState>) -> std::io::Result<()> {
    let listen_addr = state.config.peer_mesh.listen_addr.clone();
    let allowed_origins = state.config.peer_mesh.cors_allowed_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }
        App::new()
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .route("/api/coordination/message", web::post().to(post_message))
            .route("/api/coordination/peers", web::get().to(get_peers))
            .route("/api/coordination/consensus", web::post().to(post_consensus))
            .route("/api/settlements/{id}/declare", web::post().to(post_declare))
            .route("/api/settlements/{id}/finalize", web::post().to(post_finalize))
            .route("/api/disputes", web::post().to(post_initiate_dispute))
            .route("/api/disputes/{id}/resolve", web::post().to(post_resolve_dispute))
    })
    .bind(&listen_addr)?
    .run()
    .await
}

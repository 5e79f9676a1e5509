//! ─── Mediator Node Constants ─────────────────────────────────────────────────
//!
//! Defaults for the values spec.md §6 enumerates as configuration keys.
//! `medi-config` is authoritative at runtime; these are the fallback
//! defaults a fresh `Config` is built from, kept here so every crate can
//! reference them without depending on `medi-config`.

// ── Embeddings / vector index ─────────────────────────────────────────────────

/// Default embedding dimensionality.
pub const DEFAULT_VECTOR_DIMENSIONS: usize = 1536;

/// Default bound on cached intents (also bounds the vector index size).
pub const DEFAULT_MAX_INTENTS_CACHE: usize = 10_000;

// ── Alignment cycle ───────────────────────────────────────────────────────────

/// Default alignment cycle interval (milliseconds).
pub const DEFAULT_ALIGNMENT_CYCLE_INTERVAL_MS: u64 = 30_000;

/// Default top-N intents snapshotted per cycle.
pub const DEFAULT_CYCLE_SNAPSHOT_N: usize = 100;

/// Default top-k nearest neighbours queried per intent.
pub const DEFAULT_CYCLE_TOP_K: usize = 10;

/// Default max negotiated candidates attempted per cycle.
pub const DEFAULT_CYCLE_MAX_NEGOTIATIONS: usize = 3;

/// Default minimum negotiation confidence to proceed to submission.
pub const DEFAULT_MIN_NEGOTIATION_CONFIDENCE: f64 = 0.6;

// ── Work claims ───────────────────────────────────────────────────────────────

/// Maximum lifetime of a work claim (seconds).
pub const WORK_CLAIM_TTL_SECS: i64 = 5 * 60;

/// Per-peer broadcast timeout (seconds).
pub const PEER_BROADCAST_TIMEOUT_SECS: u64 = 5;

// ── Burn ledger ────────────────────────────────────────────────────────────────

pub const DEFAULT_FREE_DAILY_SUBMISSIONS: u32 = 1;
pub const DEFAULT_BASE_FILING_BURN: f64 = 10.0;
pub const DEFAULT_BURN_ESCALATION_BASE: f64 = 2.0;
pub const DEFAULT_BURN_ESCALATION_EXPONENT: f64 = 1.0;
pub const DEFAULT_SUCCESS_BURN_PERCENTAGE: f64 = 0.0005; // 5 bp
pub const MIN_SUCCESS_BURN: f64 = 0.0001; // 10^-4, below which it's skipped

/// Burn history is truncated to the last N records on persistence.
pub const MAX_BURN_HISTORY: usize = 10_000;

// ── Load monitor ───────────────────────────────────────────────────────────────

pub const DEFAULT_LOAD_MONITOR_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_TARGET_INTENT_RATE: f64 = 10.0;
pub const DEFAULT_MAX_INTENT_RATE: f64 = 50.0;
pub const DEFAULT_MAX_LOAD_MULTIPLIER: f64 = 10.0;
pub const DEFAULT_LOAD_SMOOTHING_FACTOR: f64 = 0.3;
pub const LOAD_WINDOW_SECS: i64 = 5 * 60;

// ── Sybil resistance ─────────────────────────────────────────────────────────

pub const DEFAULT_DAILY_FREE_LIMIT: u32 = 1;
pub const DEFAULT_EXCESS_DEPOSIT_AMOUNT: f64 = 50.0;
pub const DEFAULT_DEPOSIT_REFUND_DAYS: i64 = 7;

// ── Dispute / evidence ─────────────────────────────────────────────────────────

pub const DEFAULT_EFFORT_RETENTION_DAYS: i64 = 365;

// ── Challenge detector / semantic consensus ───────────────────────────────────

pub const DEFAULT_MIN_CONFIDENCE_TO_CHALLENGE: f64 = 0.7;
pub const DEFAULT_HIGH_VALUE_THRESHOLD: f64 = 10_000.0;
pub const DEFAULT_REQUIRED_VERIFIERS: u32 = 3;
pub const DEFAULT_REQUIRED_CONSENSUS: u32 = 2;
pub const DEFAULT_SEMANTIC_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_VERIFICATION_DEADLINE_HOURS: i64 = 24;

// ── Peer mesh ──────────────────────────────────────────────────────────────────

pub const DEFAULT_PEER_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_PEER_DISCOVERY_INTERVAL_SECS: u64 = 60;

// ── Shutdown ───────────────────────────────────────────────────────────────────

pub const DEFAULT_MAX_SHUTDOWN_DELAY_SECS: u64 = 30;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// ── Prompt-injection defence ───────────────────────────────────────────────────

/// Attempts per rolling hour before an author is rate-limited.
pub const DEFAULT_INJECTION_RATE_LIMIT_THRESHOLD: u32 = 5;

// ── Remote retry ───────────────────────────────────────────────────────────────

pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

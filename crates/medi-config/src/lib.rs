//! Mediator node configuration.
//!
//! Grounded on `chronx-node::Args`, generalised from clap flags to
//! environment variables per spec.md §6's "Configuration" table, and split
//! into one nested struct per subsystem rather than one flat struct, since
//! the subsystem boundaries here (chain, burn, load, cycle, challenge,
//! consensus, sybil, dispute, effort) are load-bearing elsewhere in the
//! workspace.
//!
//! `Config::from_env()` is the only constructor: every field is either
//! parsed from an environment variable or falls back to the default from
//! `medi_core::constants`, then the whole tree is validated once so a
//! misconfigured node fails at startup rather than mid-cycle.

mod env;

use std::path::PathBuf;

use medi_core::{constants, MediatorError};

use env::{var_opt, var_or, var_string_or};

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub base_url: String,
    pub chain_id: String,
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl ChainConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            base_url: var_string_or("MEDI_CHAIN_BASE_URL", "http://127.0.0.1:9944"),
            chain_id: var_string_or("MEDI_CHAIN_ID", "devnet"),
            bearer_token: var_opt("MEDI_CHAIN_BEARER_TOKEN")?,
            timeout_secs: var_or("MEDI_CHAIN_TIMEOUT_SECS", constants::DEFAULT_HTTP_TIMEOUT_SECS)?,
            retry_max_attempts: var_or("MEDI_CHAIN_RETRY_MAX_ATTEMPTS", constants::DEFAULT_RETRY_MAX_ATTEMPTS)?,
            retry_base_delay_ms: var_or("MEDI_CHAIN_RETRY_BASE_DELAY_MS", constants::DEFAULT_RETRY_BASE_DELAY_MS)?,
        })
    }
}

/// Validator scheduling mode (spec.md §6 `consensusMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusMode {
    Permissionless,
    Dpos,
    Poa,
    Hybrid,
}

impl std::str::FromStr for ConsensusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permissionless" => Ok(Self::Permissionless),
            "dpos" => Ok(Self::Dpos),
            "poa" => Ok(Self::Poa),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown consensus mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinationConfig {
    pub consensus_mode: ConsensusMode,
    pub min_effective_stake: f64,
    pub facilitation_fee_percent: f64,
}

impl CoordinationConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            consensus_mode: var_or("MEDI_CONSENSUS_MODE", ConsensusMode::Dpos)?,
            min_effective_stake: var_or("MEDI_MIN_EFFECTIVE_STAKE", 0.0)?,
            facilitation_fee_percent: var_or("MEDI_FACILITATION_FEE_PERCENT", 0.0)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub acceptance_window_hours: i64,
    pub require_human_ratification: bool,
}

impl SettlementConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            acceptance_window_hours: var_or("MEDI_SETTLEMENT_ACCEPTANCE_WINDOW_HOURS", 72)?,
            require_human_ratification: var_or("MEDI_REQUIRE_HUMAN_RATIFICATION", true)?,
        })
    }
}

/// Feature toggles (spec.md §6 `enable*` keys). Each subsystem's background
/// loop checks its flag before doing any work rather than being omitted from
/// startup, so a disabled feature still shows up (idle) in logs and metrics.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub enable_challenge_submission: bool,
    pub enable_semantic_consensus: bool,
    pub enable_sybil_resistance: bool,
    pub enable_dispute_system: bool,
    pub auto_freeze_evidence: bool,
    pub enable_effort_capture: bool,
}

impl FeatureFlags {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            enable_challenge_submission: var_or("MEDI_ENABLE_CHALLENGE_SUBMISSION", true)?,
            enable_semantic_consensus: var_or("MEDI_ENABLE_SEMANTIC_CONSENSUS", true)?,
            enable_sybil_resistance: var_or("MEDI_ENABLE_SYBIL_RESISTANCE", true)?,
            enable_dispute_system: var_or("MEDI_ENABLE_DISPUTE_SYSTEM", true)?,
            auto_freeze_evidence: var_or("MEDI_AUTO_FREEZE_EVIDENCE", true)?,
            enable_effort_capture: var_or("MEDI_ENABLE_EFFORT_CAPTURE", true)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BurnConfig {
    pub free_daily_submissions: u32,
    pub base_filing_burn: f64,
    pub escalation_base: f64,
    pub escalation_exponent: f64,
    pub success_burn_percentage: f64,
}

impl BurnConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            free_daily_submissions: var_or("MEDI_BURN_FREE_DAILY_SUBMISSIONS", constants::DEFAULT_FREE_DAILY_SUBMISSIONS)?,
            base_filing_burn: var_or("MEDI_BURN_BASE_FILING", constants::DEFAULT_BASE_FILING_BURN)?,
            escalation_base: var_or("MEDI_BURN_ESCALATION_BASE", constants::DEFAULT_BURN_ESCALATION_BASE)?,
            escalation_exponent: var_or("MEDI_BURN_ESCALATION_EXPONENT", constants::DEFAULT_BURN_ESCALATION_EXPONENT)?,
            success_burn_percentage: var_or("MEDI_BURN_SUCCESS_PERCENTAGE", constants::DEFAULT_SUCCESS_BURN_PERCENTAGE)?,
        })
    }

    fn validate(&self) -> Result<(), MediatorError> {
        if self.escalation_base < 1.0 {
            return Err(MediatorError::config("burn.escalation_base must be >= 1.0"));
        }
        if self.success_burn_percentage < 0.0 {
            return Err(MediatorError::config("burn.success_burn_percentage must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SybilConfig {
    pub daily_free_limit: u32,
    pub excess_deposit_amount: f64,
    pub deposit_refund_days: i64,
}

impl SybilConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            daily_free_limit: var_or("MEDI_SYBIL_DAILY_FREE_LIMIT", constants::DEFAULT_DAILY_FREE_LIMIT)?,
            excess_deposit_amount: var_or("MEDI_SYBIL_EXCESS_DEPOSIT_AMOUNT", constants::DEFAULT_EXCESS_DEPOSIT_AMOUNT)?,
            deposit_refund_days: var_or("MEDI_SYBIL_DEPOSIT_REFUND_DAYS", constants::DEFAULT_DEPOSIT_REFUND_DAYS)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub monitor_interval_ms: u64,
    pub target_intent_rate: f64,
    pub max_intent_rate: f64,
    pub max_load_multiplier: f64,
    pub smoothing_factor: f64,
}

impl LoadConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            monitor_interval_ms: var_or("MEDI_LOAD_MONITOR_INTERVAL_MS", constants::DEFAULT_LOAD_MONITOR_INTERVAL_MS)?,
            target_intent_rate: var_or("MEDI_LOAD_TARGET_INTENT_RATE", constants::DEFAULT_TARGET_INTENT_RATE)?,
            max_intent_rate: var_or("MEDI_LOAD_MAX_INTENT_RATE", constants::DEFAULT_MAX_INTENT_RATE)?,
            max_load_multiplier: var_or("MEDI_LOAD_MAX_MULTIPLIER", constants::DEFAULT_MAX_LOAD_MULTIPLIER)?,
            smoothing_factor: var_or("MEDI_LOAD_SMOOTHING_FACTOR", constants::DEFAULT_LOAD_SMOOTHING_FACTOR)?,
        })
    }

    fn validate(&self) -> Result<(), MediatorError> {
        if self.max_load_multiplier < 1.0 {
            return Err(MediatorError::config("load.max_load_multiplier must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(MediatorError::config("load.smoothing_factor must be in [0, 1]"));
        }
        if self.max_intent_rate < self.target_intent_rate {
            return Err(MediatorError::config("load.max_intent_rate must be >= load.target_intent_rate"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub interval_ms: u64,
    pub vector_dimensions: usize,
    pub max_intents_cache: usize,
    pub snapshot_n: usize,
    pub top_k: usize,
    pub max_negotiations: usize,
    pub min_negotiation_confidence: f64,
}

impl CycleConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            interval_ms: var_or("MEDI_CYCLE_INTERVAL_MS", constants::DEFAULT_ALIGNMENT_CYCLE_INTERVAL_MS)?,
            vector_dimensions: var_or("MEDI_CYCLE_VECTOR_DIMENSIONS", constants::DEFAULT_VECTOR_DIMENSIONS)?,
            max_intents_cache: var_or("MEDI_CYCLE_MAX_INTENTS_CACHE", constants::DEFAULT_MAX_INTENTS_CACHE)?,
            snapshot_n: var_or("MEDI_CYCLE_SNAPSHOT_N", constants::DEFAULT_CYCLE_SNAPSHOT_N)?,
            top_k: var_or("MEDI_CYCLE_TOP_K", constants::DEFAULT_CYCLE_TOP_K)?,
            max_negotiations: var_or("MEDI_CYCLE_MAX_NEGOTIATIONS", constants::DEFAULT_CYCLE_MAX_NEGOTIATIONS)?,
            min_negotiation_confidence: var_or(
                "MEDI_CYCLE_MIN_NEGOTIATION_CONFIDENCE",
                constants::DEFAULT_MIN_NEGOTIATION_CONFIDENCE,
            )?,
        })
    }

    fn validate(&self) -> Result<(), MediatorError> {
        if self.top_k == 0 {
            return Err(MediatorError::config("cycle.top_k must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.min_negotiation_confidence) {
            return Err(MediatorError::config("cycle.min_negotiation_confidence must be in [0, 1]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    pub min_confidence_to_challenge: f64,
    pub high_value_threshold: f64,
}

impl ChallengeConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            min_confidence_to_challenge: var_or(
                "MEDI_CHALLENGE_MIN_CONFIDENCE",
                constants::DEFAULT_MIN_CONFIDENCE_TO_CHALLENGE,
            )?,
            high_value_threshold: var_or("MEDI_CHALLENGE_HIGH_VALUE_THRESHOLD", constants::DEFAULT_HIGH_VALUE_THRESHOLD)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    pub required_verifiers: u32,
    pub required_consensus: u32,
    pub semantic_similarity_threshold: f64,
    pub verification_deadline_hours: i64,
}

impl ConsensusConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            required_verifiers: var_or("MEDI_CONSENSUS_REQUIRED_VERIFIERS", constants::DEFAULT_REQUIRED_VERIFIERS)?,
            required_consensus: var_or("MEDI_CONSENSUS_REQUIRED_CONSENSUS", constants::DEFAULT_REQUIRED_CONSENSUS)?,
            semantic_similarity_threshold: var_or(
                "MEDI_CONSENSUS_SEMANTIC_SIMILARITY_THRESHOLD",
                constants::DEFAULT_SEMANTIC_SIMILARITY_THRESHOLD,
            )?,
            verification_deadline_hours: var_or(
                "MEDI_CONSENSUS_VERIFICATION_DEADLINE_HOURS",
                constants::DEFAULT_VERIFICATION_DEADLINE_HOURS,
            )?,
        })
    }

    fn validate(&self) -> Result<(), MediatorError> {
        if self.required_consensus > self.required_verifiers {
            return Err(MediatorError::config(
                "consensus.required_consensus must be <= consensus.required_verifiers",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DisputeConfig {
    pub effort_retention_days: i64,
}

impl DisputeConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            effort_retention_days: var_or("MEDI_DISPUTE_EFFORT_RETENTION_DAYS", constants::DEFAULT_EFFORT_RETENTION_DAYS)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EffortConfig {
    pub injection_rate_limit_threshold: u32,
    pub segmentation_strategy: medi_core::SegmentationStrategy,
    pub time_window_minutes: i64,
    pub activity_gap_minutes: i64,
}

impl EffortConfig {
    fn from_env() -> Result<Self, MediatorError> {
        Ok(Self {
            injection_rate_limit_threshold: var_or(
                "MEDI_EFFORT_INJECTION_RATE_LIMIT_THRESHOLD",
                constants::DEFAULT_INJECTION_RATE_LIMIT_THRESHOLD,
            )?,
            segmentation_strategy: var_or(
                "MEDI_EFFORT_SEGMENTATION_STRATEGY",
                medi_core::SegmentationStrategy::Hybrid,
            )?,
            time_window_minutes: var_or("MEDI_EFFORT_TIME_WINDOW_MINUTES", 30)?,
            activity_gap_minutes: var_or("MEDI_EFFORT_ACTIVITY_GAP_MINUTES", 15)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PeerMeshConfig {
    pub listen_addr: String,
    pub bootstrap_peers: Vec<String>,
    pub heartbeat_interval_secs: u64,
    pub discovery_interval_secs: u64,
    /// Origins allowed to call the peer-mesh HTTP surface cross-origin.
    /// Empty means no cross-origin caller is trusted (spec.md §9's
    /// stricter CORS variant — an explicit allow-list, not `permissive()`).
    pub cors_allowed_origins: Vec<String>,
}

impl PeerMeshConfig {
    fn from_env() -> Result<Self, MediatorError> {
        let bootstrap_raw = var_string_or("MEDI_PEER_BOOTSTRAP", "");
        let bootstrap_peers = bootstrap_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let cors_raw = var_string_or("MEDI_PEER_CORS_ALLOWED_ORIGINS", "");
        let cors_allowed_origins = cors_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            listen_addr: var_string_or("MEDI_PEER_LISTEN_ADDR", "127.0.0.1:7700"),
            bootstrap_peers,
            heartbeat_interval_secs: var_or(
                "MEDI_PEER_HEARTBEAT_INTERVAL_SECS",
                constants::DEFAULT_PEER_HEARTBEAT_INTERVAL_SECS,
            )?,
            discovery_interval_secs: var_or(
                "MEDI_PEER_DISCOVERY_INTERVAL_SECS",
                constants::DEFAULT_PEER_DISCOVERY_INTERVAL_SECS,
            )?,
            cors_allowed_origins,
        })
    }
}

/// The full, validated mediator node configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub keypair_path: PathBuf,
    pub max_shutdown_delay_secs: u64,
    pub chain: ChainConfig,
    pub coordination: CoordinationConfig,
    pub settlement: SettlementConfig,
    pub burn: BurnConfig,
    pub sybil: SybilConfig,
    pub load: LoadConfig,
    pub cycle: CycleConfig,
    pub challenge: ChallengeConfig,
    pub consensus: ConsensusConfig,
    pub dispute: DisputeConfig,
    pub effort: EffortConfig,
    pub peer_mesh: PeerMeshConfig,
    pub features: FeatureFlags,
}

impl Config {
    pub fn from_env() -> Result<Self, MediatorError> {
        let data_dir = PathBuf::from(var_string_or("MEDI_DATA_DIR", "./data"));
        let keypair_path = PathBuf::from(var_string_or(
            "MEDI_KEYPAIR_PATH",
            data_dir.join("mediator.pem").to_string_lossy().to_string(),
        ));

        let config = Self {
            data_dir,
            keypair_path,
            max_shutdown_delay_secs: var_or(
                "MEDI_MAX_SHUTDOWN_DELAY_SECS",
                constants::DEFAULT_MAX_SHUTDOWN_DELAY_SECS,
            )?,
            chain: ChainConfig::from_env()?,
            coordination: CoordinationConfig::from_env()?,
            settlement: SettlementConfig::from_env()?,
            burn: BurnConfig::from_env()?,
            sybil: SybilConfig::from_env()?,
            load: LoadConfig::from_env()?,
            cycle: CycleConfig::from_env()?,
            challenge: ChallengeConfig::from_env()?,
            consensus: ConsensusConfig::from_env()?,
            dispute: DisputeConfig::from_env()?,
            effort: EffortConfig::from_env()?,
            peer_mesh: PeerMeshConfig::from_env()?,
            features: FeatureFlags::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), MediatorError> {
        self.burn.validate()?;
        self.load.validate()?;
        self.cycle.validate()?;
        self.consensus.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let config = Config {
            data_dir: PathBuf::from("./data"),
            keypair_path: PathBuf::from("./data/mediator.pem"),
            max_shutdown_delay_secs: constants::DEFAULT_MAX_SHUTDOWN_DELAY_SECS,
            chain: ChainConfig {
                base_url: "http://127.0.0.1:9944".into(),
                chain_id: "devnet".into(),
                bearer_token: None,
                timeout_secs: constants::DEFAULT_HTTP_TIMEOUT_SECS,
                retry_max_attempts: constants::DEFAULT_RETRY_MAX_ATTEMPTS,
                retry_base_delay_ms: constants::DEFAULT_RETRY_BASE_DELAY_MS,
            },
            coordination: CoordinationConfig {
                consensus_mode: ConsensusMode::Dpos,
                min_effective_stake: 0.0,
                facilitation_fee_percent: 0.0,
            },
            settlement: SettlementConfig {
                acceptance_window_hours: 72,
                require_human_ratification: true,
            },
            burn: BurnConfig {
                free_daily_submissions: constants::DEFAULT_FREE_DAILY_SUBMISSIONS,
                base_filing_burn: constants::DEFAULT_BASE_FILING_BURN,
                escalation_base: constants::DEFAULT_BURN_ESCALATION_BASE,
                escalation_exponent: constants::DEFAULT_BURN_ESCALATION_EXPONENT,
                success_burn_percentage: constants::DEFAULT_SUCCESS_BURN_PERCENTAGE,
            },
            sybil: SybilConfig {
                daily_free_limit: constants::DEFAULT_DAILY_FREE_LIMIT,
                excess_deposit_amount: constants::DEFAULT_EXCESS_DEPOSIT_AMOUNT,
                deposit_refund_days: constants::DEFAULT_DEPOSIT_REFUND_DAYS,
            },
            load: LoadConfig {
                monitor_interval_ms: constants::DEFAULT_LOAD_MONITOR_INTERVAL_MS,
                target_intent_rate: constants::DEFAULT_TARGET_INTENT_RATE,
                max_intent_rate: constants::DEFAULT_MAX_INTENT_RATE,
                max_load_multiplier: constants::DEFAULT_MAX_LOAD_MULTIPLIER,
                smoothing_factor: constants::DEFAULT_LOAD_SMOOTHING_FACTOR,
            },
            cycle: CycleConfig {
                interval_ms: constants::DEFAULT_ALIGNMENT_CYCLE_INTERVAL_MS,
                vector_dimensions: constants::DEFAULT_VECTOR_DIMENSIONS,
                max_intents_cache: constants::DEFAULT_MAX_INTENTS_CACHE,
                snapshot_n: constants::DEFAULT_CYCLE_SNAPSHOT_N,
                top_k: constants::DEFAULT_CYCLE_TOP_K,
                max_negotiations: constants::DEFAULT_CYCLE_MAX_NEGOTIATIONS,
                min_negotiation_confidence: constants::DEFAULT_MIN_NEGOTIATION_CONFIDENCE,
            },
            challenge: ChallengeConfig {
                min_confidence_to_challenge: constants::DEFAULT_MIN_CONFIDENCE_TO_CHALLENGE,
                high_value_threshold: constants::DEFAULT_HIGH_VALUE_THRESHOLD,
            },
            consensus: ConsensusConfig {
                required_verifiers: constants::DEFAULT_REQUIRED_VERIFIERS,
                required_consensus: constants::DEFAULT_REQUIRED_CONSENSUS,
                semantic_similarity_threshold: constants::DEFAULT_SEMANTIC_SIMILARITY_THRESHOLD,
                verification_deadline_hours: constants::DEFAULT_VERIFICATION_DEADLINE_HOURS,
            },
            dispute: DisputeConfig {
                effort_retention_days: constants::DEFAULT_EFFORT_RETENTION_DAYS,
            },
            effort: EffortConfig {
                injection_rate_limit_threshold: constants::DEFAULT_INJECTION_RATE_LIMIT_THRESHOLD,
                segmentation_strategy: medi_core::SegmentationStrategy::Hybrid,
                time_window_minutes: 30,
                activity_gap_minutes: 15,
            },
            peer_mesh: PeerMeshConfig {
                listen_addr: "127.0.0.1:7700".into(),
                bootstrap_peers: vec![],
                heartbeat_interval_secs: constants::DEFAULT_PEER_HEARTBEAT_INTERVAL_SECS,
                discovery_interval_secs: constants::DEFAULT_PEER_DISCOVERY_INTERVAL_SECS,
                cors_allowed_origins: vec![],
            },
            features: FeatureFlags {
                enable_challenge_submission: true,
                enable_semantic_consensus: true,
                enable_sybil_resistance: true,
                enable_dispute_system: true,
                auto_freeze_evidence: true,
                enable_effort_capture: true,
            },
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_consensus_exceeding_verifiers() {
        let mut consensus = ConsensusConfig {
            required_verifiers: 2,
            required_consensus: 3,
            semantic_similarity_threshold: constants::DEFAULT_SEMANTIC_SIMILARITY_THRESHOLD,
            verification_deadline_hours: constants::DEFAULT_VERIFICATION_DEADLINE_HOURS,
        };
        assert!(consensus.validate().is_err());
        consensus.required_consensus = 2;
        assert!(consensus.validate().is_ok());
    }
}

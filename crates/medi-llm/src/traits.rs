//! The LLM collaborator capability quartet (spec.md §9: "LLM calls as
//! free-form strings → a Negotiator/Validator/Detector/Embedder capability
//! quartet"). Each call returns a typed record; a JSON-parsing failure on
//! the collaborator side produces a typed fallback rather than propagating
//! a parse error, per the same note.

use async_trait::async_trait;

use medi_core::{Intent, MediatorError, RiskSeverity, ValidationScores};

pub type Embedding = Vec<f32>;

/// Outcome of attempting to negotiate a settlement between two intents.
///
/// `success` is a hard pass/fail independent of `confidence` — a
/// collaborator can be fully confident that no settlement is possible
/// (e.g. the intents are mutually exclusive), so callers must reject on
/// `!success` even when `confidence` alone would clear the threshold.
#[derive(Clone, Debug, PartialEq)]
pub struct NegotiationVerdict {
    pub success: bool,
    pub confidence: f64,
    pub statement: String,
    pub reasoning: String,
    pub required_parties: Vec<String>,
}

/// Outcome of asking whether a settlement contradicts one of its intents.
#[derive(Clone, Debug, PartialEq)]
pub struct ContradictionVerdict {
    pub contradicts: bool,
    pub confidence: f64,
    pub severity: RiskSeverity,
    pub reason: String,
}

/// Produce a dense embedding for free-form prose.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, prose: &str) -> Result<Embedding, MediatorError>;
}

/// Attempt to negotiate settlement prose between two intents.
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn negotiate(&self, intent_a: &Intent, intent_b: &Intent) -> Result<NegotiationVerdict, MediatorError>;
}

/// Score a segment of captured human effort against the four-axis rubric.
#[async_trait]
pub trait EffortValidator: Send + Sync {
    async fn validate(&self, transcript: &str) -> Result<ValidationScores, MediatorError>;
}

/// Decide whether a settlement's prose contradicts either underlying intent.
#[async_trait]
pub trait ContradictionDetector: Send + Sync {
    async fn detect(
        &self,
        settlement_prose: &str,
        intent_a: &Intent,
        intent_b: &Intent,
    ) -> Result<ContradictionVerdict, MediatorError>;
}

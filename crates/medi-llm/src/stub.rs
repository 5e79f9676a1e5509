//! Deterministic stand-ins for the four LLM collaborator traits, used in
//! tests and in any deployment without a configured LLM provider. Each
//! derives its output from its input alone — no randomness, no network
//! call — so callers get identical behaviour across runs.

use async_trait::async_trait;

use medi_core::{Intent, MediatorError, RiskSeverity, ValidationScores};

use crate::traits::{ContradictionDetector, ContradictionVerdict, Embedder, Embedding, EffortValidator, NegotiationVerdict, Negotiator};

/// Produces a fixed-dimension embedding by hashing overlapping n-grams of
/// the input into buckets — not semantically meaningful, but stable and
/// cheap, useful for exercising the vector index without a real model.
pub struct StubEmbedder {
    pub dimensions: usize,
}

impl StubEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, prose: &str) -> Result<Embedding, MediatorError> {
        let mut vec = vec![0f32; self.dimensions];
        for (i, byte) in prose.bytes().enumerate() {
            let bucket = (byte as usize + i) % self.dimensions;
            vec[bucket] += 1.0;
        }
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vec.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vec)
    }
}

/// Always proposes a settlement whose prose concatenates both intents'
/// prose, with fixed confidence and both authors as required parties.
pub struct StubNegotiator {
    pub confidence: f64,
}

impl Default for StubNegotiator {
    fn default() -> Self {
        Self { confidence: 0.75 }
    }
}

#[async_trait]
impl Negotiator for StubNegotiator {
    async fn negotiate(&self, intent_a: &Intent, intent_b: &Intent) -> Result<NegotiationVerdict, MediatorError> {
        Ok(NegotiationVerdict {
            success: true,
            confidence: self.confidence,
            statement: format!(
                "Settlement between {} and {}: \"{}\" aligned with \"{}\".",
                intent_a.author, intent_b.author, intent_a.prose, intent_b.prose
            ),
            reasoning: "both intents share no explicit negation of the other's prose".into(),
            required_parties: vec![intent_a.author.to_string(), intent_b.author.to_string()],
        })
    }
}

/// Returns mid-range scores for any non-empty transcript, and the standard
/// fallback scores for an empty one.
pub struct StubEffortValidator;

#[async_trait]
impl EffortValidator for StubEffortValidator {
    async fn validate(&self, transcript: &str) -> Result<ValidationScores, MediatorError> {
        if transcript.trim().is_empty() {
            return Ok(ValidationScores::fallback());
        }
        Ok(ValidationScores {
            coherence: 0.7,
            progression: 0.7,
            consistency: 0.7,
            synthesis: 0.7,
            flags: vec![],
        })
    }
}

/// Flags a contradiction only when the settlement prose contains an
/// explicit negation of either intent's prose — a crude but deterministic
/// stand-in for a real semantic check.
pub struct StubContradictionDetector;

#[async_trait]
impl ContradictionDetector for StubContradictionDetector {
    async fn detect(
        &self,
        settlement_prose: &str,
        intent_a: &Intent,
        intent_b: &Intent,
    ) -> Result<ContradictionVerdict, MediatorError> {
        let negates = |intent_prose: &str| {
            settlement_prose.contains("not") && settlement_prose.contains(intent_prose)
        };
        let contradicts = negates(&intent_a.prose) || negates(&intent_b.prose);
        Ok(ContradictionVerdict {
            contradicts,
            confidence: if contradicts { 0.8 } else { 0.1 },
            severity: if contradicts { RiskSeverity::Medium } else { RiskSeverity::Low },
            reason: if contradicts {
                "settlement prose negates an underlying intent".into()
            } else {
                "no contradiction detected".into()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::Author;

    fn intent(prose: &str) -> Intent {
        Intent {
            hash: medi_core::IntentHash::from_bytes([0u8; 32]),
            author: Author::from("alice"),
            prose: prose.to_string(),
            desires: vec![],
            constraints: vec![],
            created_at: 0,
            priority: 0,
        }
    }

    #[tokio::test]
    async fn stub_embedder_is_deterministic_and_unit_norm() {
        let embedder = StubEmbedder::new(16);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[tokio::test]
    async fn stub_contradiction_detector_flags_explicit_negation() {
        let detector = StubContradictionDetector;
        let a = intent("share the house");
        let b = intent("sell the car");
        let verdict = detector
            .detect("We agree this does not share the house.", &a, &b)
            .await
            .unwrap();
        assert!(verdict.contradicts);
    }
}

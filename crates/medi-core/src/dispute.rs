use serde::{Deserialize, Serialize};

use crate::ids::{Author, DisputeId, PackageHash, ResolutionId, SnapshotHash};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DisputeStatus {
    Initiated,
    UnderReview,
    Clarifying,
    Escalated,
    Resolved,
}

impl DisputeStatus {
    /// Disputes in any of these states are "active" for the purposes of
    /// settlement-validator precondition gates (spec.md §4.6).
    pub fn is_active(&self) -> bool {
        !matches!(self, DisputeStatus::Resolved)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContestedItemType {
    Intent,
    Settlement,
    Receipt,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContestedItem {
    pub item_type: ContestedItemType,
    pub id: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimelineEventKind {
    Initiated,
    EvidenceAdded,
    ClarificationStarted,
    Escalated,
    Resolved,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub timestamp: i64,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dispute {
    pub dispute_id: DisputeId,
    pub status: DisputeStatus,
    pub claimant: Author,
    pub respondent: Option<Author>,
    pub contested_items: Vec<ContestedItem>,
    pub frozen_item_ids: Vec<String>,
    pub timeline: Vec<TimelineEvent>,
    pub created_at: i64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FrozenStatus {
    UnderDispute,
    DisputeResolved,
}

/// An artifact temporarily immutable because a dispute references it
/// (spec.md glossary, §4.7).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrozenItem {
    pub item_id: String,
    pub item_type: ContestedItemType,
    pub dispute_id: DisputeId,
    pub snapshot_hash: SnapshotHash,
    pub status: FrozenStatus,
    pub mutation_attempts: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResolutionOutcome {
    ClaimantFavored,
    RespondentFavored,
    Compromise,
    Dismissed,
    Other,
}

impl ResolutionOutcome {
    /// Punitive resolutions keep frozen items frozen pending external
    /// enforcement (spec.md §4.7); non-punitive ones unfreeze.
    pub fn is_punitive(&self) -> bool {
        matches!(self, ResolutionOutcome::ClaimantFavored | ResolutionOutcome::RespondentFavored)
    }
}

/// Write-once outcome record: once written, no field may change (spec.md
/// §3 invariant, `isImmutable = true`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub resolution_id: ResolutionId,
    pub dispute_id: DisputeId,
    pub outcome: ResolutionOutcome,
    pub is_immutable: bool,
    pub recorded_at: i64,
}

/// A verifiable bundle collating a dispute's timeline, evidence, and
/// receipts (spec.md §4.7).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DisputePackage {
    pub dispute_id: DisputeId,
    pub package_hash: PackageHash,
    pub contested_item_ids: Vec<String>,
    pub evidence_item_ids: Vec<String>,
    pub clarification_ids: Vec<String>,
    pub built_at: i64,
}

//! Dispute lifecycle (spec.md §4.7 step 2): a monotonic sequence of typed
//! timeline events driving `Dispute.status`.

use medi_core::{Author, ContestedItem, Dispute, DisputeId, DisputeStatus, MediatorError, TimelineEvent, TimelineEventKind};

pub fn initiate(dispute_id: DisputeId, claimant: Author, contested_items: Vec<ContestedItem>, now: i64) -> Dispute {
    Dispute {
        dispute_id,
        status: DisputeStatus::Initiated,
        claimant,
        respondent: None,
        contested_items,
        frozen_item_ids: vec![],
        timeline: vec![TimelineEvent {
            kind: TimelineEventKind::Initiated,
            timestamp: now,
            detail: "dispute initiated".into(),
        }],
        created_at: now,
    }
}

fn push_event(dispute: &mut Dispute, kind: TimelineEventKind, now: i64, detail: String) {
    dispute.timeline.push(TimelineEvent { kind, timestamp: now, detail });
}

fn reject_if_resolved(dispute: &Dispute) -> Result<(), MediatorError> {
    if dispute.status == DisputeStatus::Resolved {
        return Err(MediatorError::conflict(format!(
            "dispute {} is already resolved",
            dispute.dispute_id
        )));
    }
    Ok(())
}

pub fn add_evidence(dispute: &mut Dispute, item_id: String, now: i64) -> Result<(), MediatorError> {
    reject_if_resolved(dispute)?;
    dispute.frozen_item_ids.push(item_id.clone());
    push_event(dispute, TimelineEventKind::EvidenceAdded, now, format!("evidence added: {item_id}"));
    if dispute.status == DisputeStatus::Initiated {
        dispute.status = DisputeStatus::UnderReview;
    }
    Ok(())
}

pub fn start_clarification(dispute: &mut Dispute, now: i64) -> Result<(), MediatorError> {
    match dispute.status {
        DisputeStatus::Initiated | DisputeStatus::UnderReview => {
            dispute.status = DisputeStatus::Clarifying;
            push_event(dispute, TimelineEventKind::ClarificationStarted, now, "clarification started".into());
            Ok(())
        }
        other => Err(MediatorError::validation(format!("cannot start clarification from {other:?}"))),
    }
}

pub fn escalate(dispute: &mut Dispute, now: i64) -> Result<(), MediatorError> {
    reject_if_resolved(dispute)?;
    dispute.status = DisputeStatus::Escalated;
    push_event(dispute, TimelineEventKind::Escalated, now, "escalated".into());
    Ok(())
}

pub fn resolve(dispute: &mut Dispute, now: i64) -> Result<(), MediatorError> {
    reject_if_resolved(dispute)?;
    dispute.status = DisputeStatus::Resolved;
    push_event(dispute, TimelineEventKind::Resolved, now, "resolved".into());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_walks_through_clarification_to_resolution() {
        let mut d = initiate("d1".into(), "alice".into(), vec![], 0);
        add_evidence(&mut d, "intent-1".into(), 1).unwrap();
        assert_eq!(d.status, DisputeStatus::UnderReview);
        start_clarification(&mut d, 2).unwrap();
        assert_eq!(d.status, DisputeStatus::Clarifying);
        escalate(&mut d, 3).unwrap();
        assert_eq!(d.status, DisputeStatus::Escalated);
        resolve(&mut d, 4).unwrap();
        assert_eq!(d.status, DisputeStatus::Resolved);
        assert_eq!(d.timeline.len(), 5);
    }

    #[test]
    fn cannot_mutate_a_resolved_dispute() {
        let mut d = initiate("d1".into(), "alice".into(), vec![], 0);
        resolve(&mut d, 1).unwrap();
        assert!(add_evidence(&mut d, "x".into(), 2).is_err());
        assert!(resolve(&mut d, 2).is_err());
    }
}

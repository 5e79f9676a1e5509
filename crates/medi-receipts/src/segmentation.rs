//! Deterministic signal segmentation (spec.md §4.8): three strategies,
//! chosen by `SegmentationStrategy` from `medi-config`.

use medi_core::{SegmentId, SegmentationStrategy, Signal};

/// Split `signals` (already sorted by `timestamp` ascending) into
/// contiguous segments according to `strategy`.
///
/// - *Time window*: fixed `window_minutes`-minute buckets aligned to the
///   first signal's timestamp.
/// - *Activity boundary*: split whenever the gap to the next signal
///   exceeds `gap_minutes`.
/// - *Hybrid*: split on either condition.
pub fn segment(
    signals: &[Signal],
    strategy: SegmentationStrategy,
    window_minutes: i64,
    gap_minutes: i64,
    id_for: impl Fn(usize) -> SegmentId,
) -> Vec<SegmentBuilder> {
    if signals.is_empty() {
        return vec![];
    }

    let window_ms = window_minutes * 60_000;
    let gap_ms = gap_minutes * 60_000;
    let first_ts = signals[0].timestamp;

    let mut segments: Vec<SegmentBuilder> = Vec::new();
    let mut current = SegmentBuilder::new(&signals[0]);

    for pair in signals.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let crosses_window = matches!(strategy, SegmentationStrategy::TimeWindow | SegmentationStrategy::Hybrid)
            && (next.timestamp - first_ts) / window_ms != (prev.timestamp - first_ts) / window_ms;
        let crosses_gap = matches!(strategy, SegmentationStrategy::ActivityBoundary | SegmentationStrategy::Hybrid)
            && (next.timestamp - prev.timestamp) > gap_ms;

        if crosses_window || crosses_gap {
            segments.push(current);
            current = SegmentBuilder::new(next);
        } else {
            current.push(next);
        }
    }
    segments.push(current);

    for (index, builder) in segments.iter_mut().enumerate() {
        builder.id = Some(id_for(index));
    }
    segments
}

/// Accumulates one segment's signal ids and time bounds before an id is
/// assigned.
pub struct SegmentBuilder {
    id: Option<SegmentId>,
    pub signal_ids: Vec<String>,
    pub started_at: i64,
    pub ended_at: i64,
}

impl SegmentBuilder {
    fn new(first: &Signal) -> Self {
        Self { id: None, signal_ids: vec![first.id.clone()], started_at: first.timestamp, ended_at: first.timestamp }
    }

    fn push(&mut self, signal: &Signal) {
        self.signal_ids.push(signal.id.clone());
        self.ended_at = signal.timestamp;
    }

    pub fn into_segment(self, strategy: SegmentationStrategy) -> medi_core::Segment {
        medi_core::Segment {
            id: self.id.expect("segment id assigned by segment()"),
            strategy,
            signal_ids: self.signal_ids,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(id: &str, ts: i64) -> Signal {
        Signal { id: id.into(), modality: "text".into(), timestamp: ts, content: "x".into(), hash: medi_core::SignalHash::from_bytes([0; 32]) }
    }

    fn seg_id(i: usize) -> SegmentId {
        SegmentId::from(format!("seg-{i}"))
    }

    #[test]
    fn time_window_splits_on_window_boundary() {
        let signals = vec![signal("a", 0), signal("b", 5 * 60_000), signal("c", 11 * 60_000)];
        let segments = segment(&signals, SegmentationStrategy::TimeWindow, 10, 30, seg_id);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].signal_ids, vec!["a", "b"]);
        assert_eq!(segments[1].signal_ids, vec!["c"]);
    }

    #[test]
    fn activity_boundary_splits_on_large_gap() {
        let signals = vec![signal("a", 0), signal("b", 60_000), signal("c", 60 * 60_000)];
        let segments = segment(&signals, SegmentationStrategy::ActivityBoundary, 10, 5, seg_id);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].signal_ids, vec!["a", "b"]);
        assert_eq!(segments[1].signal_ids, vec!["c"]);
    }

    #[test]
    fn hybrid_splits_on_either_condition() {
        let signals = vec![signal("a", 0), signal("b", 11 * 60_000), signal("c", 12 * 60_000)];
        let segments = segment(&signals, SegmentationStrategy::Hybrid, 10, 30, seg_id);
        // a splits from b purely by window crossing even though the gap is small.
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].signal_ids, vec!["a"]);
        assert_eq!(segments[1].signal_ids, vec!["b", "c"]);
    }

    #[test]
    fn single_signal_is_its_own_segment() {
        let signals = vec![signal("a", 0)];
        let segments = segment(&signals, SegmentationStrategy::Hybrid, 10, 30, seg_id);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].signal_ids, vec!["a"]);
    }
}

pub mod pipeline;
pub mod segmentation;

pub use pipeline::{build_receipt, build_transcript, mark_anchored, mark_validated, mark_verified, validate_segment};
pub use segmentation::{segment, SegmentBuilder};

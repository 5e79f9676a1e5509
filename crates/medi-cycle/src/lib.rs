pub mod engine;

pub use engine::{AlignmentCycle, BurnContext, TickOutcome};

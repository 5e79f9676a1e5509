pub mod consensus;
pub mod detector;

pub use consensus::{resolve, ConsensusOutcome, VerificationTally};
pub use detector::{build_challenge, evaluate_settlement, ChallengeLog};

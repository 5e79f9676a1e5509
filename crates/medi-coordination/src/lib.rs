pub mod claims;
pub mod client;
pub mod message;
pub mod peers;
pub mod rotation;

pub use claims::WorkClaimTable;
pub use client::{ConsensusVerdict, CoordinationClient};
pub use message::CoordinationMessage;
pub use peers::PeerTable;
pub use rotation::{ValidatorEntry, ValidatorRotation};

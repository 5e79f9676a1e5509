pub mod client;
pub mod types;

pub use client::ChainClient;
pub use types::{
    BurnResponse, ChallengeResponse, IntentsResponse, OkResponse, SettlementsResponse,
    SpamProofResponse, SubmitSettlementResponse, VerificationRequestsResponse,
};

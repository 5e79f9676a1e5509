pub mod state_machine;
pub mod validator;

pub use state_machine::{contest, declare, finalize, ratify, recompute_hash, reversal_of};
pub use validator::{Advisory, SettlementValidator, ValidationContext};

pub mod burn;
pub mod challenge;
pub mod claim;
pub mod constants;
pub mod dispute;
pub mod error;
pub mod ids;
pub mod intent;
pub mod peer;
pub mod receipt;
pub mod settlement;
pub mod store;

pub use burn::*;
pub use challenge::*;
pub use claim::*;
pub use constants::*;
pub use dispute::*;
pub use error::MediatorError;
pub use ids::*;
pub use intent::*;
pub use peer::*;
pub use receipt::*;
pub use settlement::*;

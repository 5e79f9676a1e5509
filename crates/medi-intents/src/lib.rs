pub mod cache;
pub mod vector_index;

pub use cache::IntentCache;
pub use vector_index::VectorIndex;

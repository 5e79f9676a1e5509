pub mod freezer;
pub mod lifecycle;
pub mod package;

pub use freezer::EvidenceFreezer;
pub use package::{build_package, PackageInputs};

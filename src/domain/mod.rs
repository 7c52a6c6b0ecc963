//! Domain layer - Pure business logic.

// Input normalization (no capability calls, only reads named files)
pub mod extract;

// Data threaded through the pipeline stages
pub mod metadata;
pub mod outcome;
pub mod reference;

pub use extract::extract;
pub use metadata::{ResolutionMap, ResolvedMetadata};
pub use outcome::ItemOutcome;
pub use reference::{VideoReference, WorkSet};

//! Application layer - the staged pipeline built on the ports.

pub mod pipeline;

pub use pipeline::{Pipeline, RunReport};

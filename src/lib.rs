//! Vidlift - Batch Video Upload Pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure logic (references, extraction, outcomes)
//! - ports/: Trait definitions for external capabilities
//! - adapters/: Concrete implementations (youtube-dl, S3)
//! - application/: The staged pipeline coordinator
//! - config: Config file / environment / flag resolution

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::{Pipeline, RunReport};
pub use config::{ConfigError, RunConfig};
pub use domain::{ItemOutcome, VideoReference, WorkSet};

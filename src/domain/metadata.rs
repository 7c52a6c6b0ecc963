use crate::domain::reference::VideoReference;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Result of a successful metadata lookup for one reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedMetadata {
    /// The reference this metadata belongs to
    pub reference: VideoReference,
    /// Canonical local filename the fetch capability will write.
    /// May be empty when the lookup only partially succeeded.
    pub filename: String,
    /// Size in bytes of the selected format, 0 when unknown
    pub filesize: u64,
}

/// Reference -> metadata, populated concurrently during the resolve stage.
/// Absence of a key is the failure signal: a reference that failed lookup
/// never gets an entry.
pub type ResolutionMap = HashMap<VideoReference, ResolvedMetadata>;

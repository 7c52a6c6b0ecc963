use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An opaque video identifier: a URL or a platform video ID.
/// Identity is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoReference(String);

impl VideoReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VideoReference {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Ordered sequence of references built once from all input items.
/// Order-preserving; duplicates pass through independently.
#[derive(Debug, Default, Clone)]
pub struct WorkSet {
    references: Vec<VideoReference>,
}

impl WorkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, references: Vec<VideoReference>) {
        self.references.extend(references);
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VideoReference> {
        self.references.iter()
    }

    /// References that never got an entry in `map` - the post-resolve diff.
    pub fn missing_from<V>(&self, map: &HashMap<VideoReference, V>) -> Vec<VideoReference> {
        self.references
            .iter()
            .filter(|reference| !map.contains_key(reference))
            .cloned()
            .collect()
    }
}

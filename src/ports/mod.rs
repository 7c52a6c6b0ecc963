//! Ports - Trait definitions for the external capabilities the pipeline
//! calls: metadata lookup, video fetch, object-storage put.

pub mod fetch;
pub mod lookup;
pub mod storage;

pub use fetch::VideoFetcher;
pub use lookup::MetadataLookup;
pub use storage::StoragePort;

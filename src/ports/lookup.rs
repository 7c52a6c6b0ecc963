use crate::domain::metadata::ResolvedMetadata;
use crate::domain::reference::VideoReference;
use async_trait::async_trait;
use std::error::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Resolve canonical filename and filesize for one reference.
    /// An error means the reference gets no entry in the resolution map.
    async fn lookup(
        &self,
        reference: &VideoReference,
    ) -> Result<ResolvedMetadata, Box<dyn Error + Send + Sync>>;
}

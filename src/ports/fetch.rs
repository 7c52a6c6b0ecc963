use crate::domain::reference::VideoReference;
use async_trait::async_trait;
use std::error::Error;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Materialize the video in the current working directory.
    /// Success means the external fetch exited zero; the written filename
    /// is NOT verified against the resolved metadata.
    async fn fetch(&self, reference: &VideoReference) -> Result<(), Box<dyn Error + Send + Sync>>;
}

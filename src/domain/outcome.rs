/// Terminal state of one reference after the download/upload/cleanup chain.
///
/// A failed step degrades the item to an inert pass-through for the rest of
/// the chain instead of aborting the batch, so "do nothing" is a visible
/// state here rather than an absent value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Metadata resolved but nothing was materialized (empty filename);
    /// upload and cleanup were pass-through no-ops
    Resolved,
    /// The fetch capability exited non-zero; upload and cleanup skipped
    DownloadFailed,
    /// The object-storage put failed; the local file is NOT cleaned up,
    /// even when delete-downloads is set
    UploadFailed,
    /// Uploaded to storage; `removed` records whether the local copy
    /// was deleted afterwards
    Succeeded { removed: bool },
}

impl ItemOutcome {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

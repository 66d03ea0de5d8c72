use crate::error::{FetchError, SyncError};
use crate::record_store::StoreRecord;
use crate::types::{FetchedFeed, Source};
use async_trait::async_trait;

/// Retrieves and parses one source's feed document.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the source's entries in document order.
    ///
    /// Transport problems come back as [`FetchError::Network`]; a document
    /// that could only be partially read is still `Ok`, with the problem in
    /// [`FetchedFeed::warning`].
    async fn fetch(&self, source: &Source) -> Result<FetchedFeed, FetchError>;
}

/// External store of published records, keyed by a stable id.
///
/// The store is the only source of truth for what has been synced already;
/// callers must not cache its answers across runs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable name for log lines.
    fn store_name(&self) -> String;

    async fn exists(&self, key: &str) -> Result<bool, SyncError>;

    async fn create(&self, record: &StoreRecord) -> Result<(), SyncError>;
}

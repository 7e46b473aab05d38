use async_trait::async_trait;

use crate::storage::StorageError;

/// Errors produced while fetching the payload for one height.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The height has not been indexed yet. Callers retry later.
    #[error("height {0} is not indexed yet")]
    NotYetAvailable(u64),
    #[error("block {height} holds {count} transactions, expected exactly one")]
    UnexpectedTransactionCount { height: u64, count: usize },
    #[error("storage error at height {height}: {source}")]
    Storage {
        height: u64,
        #[source]
        source: StorageError,
    },
}

impl FetchError {
    /// Map a storage error at `height`; a missing record means the indexer
    /// has not reached that height yet.
    pub fn storage(height: u64, err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotYetAvailable(height),
            source => Self::Storage { height, source },
        }
    }

    pub fn is_not_yet_available(&self) -> bool {
        matches!(self, Self::NotYetAvailable(_))
    }
}

/// Per-category projection of one height into an outbound payload.
///
/// `Ok(None)` means the height exists but produces nothing for this
/// subscriber; the cursor still moves past it.
#[async_trait]
pub trait HeightFetcher: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn fetch(&self, height: u64) -> Result<Option<Self::Output>, FetchError>;
}

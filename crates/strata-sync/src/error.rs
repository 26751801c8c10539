use thiserror::Error;

use crate::api::ApiError;
use strata_store::StoreError;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by the sync layer.
///
/// Network failures mostly never reach callers: queue replay logs and
/// continues, read-throughs fall back to the cache, write-throughs fall
/// back to queue-and-optimistic-write. What remains is local storage
/// failing or a server record that does not parse.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

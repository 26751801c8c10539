use thiserror::Error;

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying storage transaction failed (disk, quota, corruption).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record was written without a string `id` field to key it by.
    #[error("Record has no string `id` field")]
    InvalidRecord,

    /// A persisted value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A collection name read back from storage is not one we know.
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// A queue action read back from storage is not one we know.
    #[error("Unknown queue action: {0}")]
    UnknownAction(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

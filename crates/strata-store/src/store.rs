use serde_json::Value;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::queue::{QueueAction, QueueEntry};

/// The trait all local storage backends implement.
///
/// Records are JSON documents keyed by their own string `id` field; writes
/// are upserts (no versioning). Each operation is one atomic storage
/// transaction. The sync queue is part of the same store so that queued
/// mutations survive alongside the caches they belong to.
pub trait LocalStore: Send + Sync {
    /// Point lookup. Absent records are `None`, not an error.
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError>;

    /// Full collection scan, in store-assigned key order.
    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    /// Upsert by the record's own `id` field.
    fn put(&self, collection: Collection, record: &Value) -> Result<(), StoreError>;

    /// Upsert a batch of records in one transaction.
    fn put_all(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError>;

    /// Remove a record. No error if absent.
    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;

    /// Empty a collection (used wholesale on logout).
    fn clear(&self, collection: Collection) -> Result<(), StoreError>;

    /// Append a pending mutation with a fresh surrogate key, `synced=false`
    /// and the current timestamp. Returns the surrogate key.
    fn enqueue(
        &self,
        action: QueueAction,
        entity: Collection,
        data: Value,
        local_id: Option<String>,
    ) -> Result<i64, StoreError>;

    /// Every queue entry (synced and unsynced), in insertion order.
    fn queue_entries(&self) -> Result<Vec<QueueEntry>, StoreError>;

    /// Flip one entry's `synced` flag. No error if the entry is gone.
    fn mark_synced(&self, id: i64) -> Result<(), StoreError>;

    /// Rewrite the payload `id` of every unsynced entry for `entity` that
    /// targets `from` so it targets `to` instead. Used when a deferred
    /// create is reconciled: mutations queued against the temporary
    /// identifier must follow it to the server-assigned one. Returns the
    /// number of entries rewritten.
    fn remap_queue_target(
        &self,
        entity: Collection,
        from: &str,
        to: &str,
    ) -> Result<usize, StoreError>;

    /// Delete every synced entry; run once per drain cycle. Returns the
    /// number of entries removed.
    fn purge_synced(&self) -> Result<usize, StoreError>;

    /// Empty the sync queue, pending entries included (logout only).
    fn clear_queue(&self) -> Result<(), StoreError>;
}

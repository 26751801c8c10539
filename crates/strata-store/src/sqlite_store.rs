use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::collection::Collection;
use crate::error::StoreError;
use crate::queue::{QueueAction, QueueEntry};
use crate::store::LocalStore;

/// Current schema version. Upgrades are additive (create-if-missing) so a
/// reopen after an app update never drops queued-but-unsynced mutations.
const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed implementation of the LocalStore trait.
///
/// All collections share one `records` table keyed by `(collection, id)`;
/// the sync queue has its own table with an auto-incrementing surrogate
/// key. Opening is idempotent: the schema step only creates what is
/// missing, and WAL plus a busy timeout keep concurrent opens of the same
/// path from corrupting it.
pub struct SqliteLocalStore {
    conn: Mutex<Connection>,
}

impl SqliteLocalStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Storage(format!("open: {}", e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Storage(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| StoreError::Storage(format!("busy_timeout: {}", e)))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE TABLE IF NOT EXISTS sync_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                entity TEXT NOT NULL,
                data TEXT NOT NULL,
                local_id TEXT,
                timestamp INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);
            CREATE INDEX IF NOT EXISTS idx_sync_queue_synced ON sync_queue(synced);
            ",
        )
        .map_err(|e| StoreError::Storage(format!("init_schema: {}", e)))?;

        let current: Option<u32> = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("schema_version: {}", e)))?;

        match current {
            None => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|e| StoreError::Storage(format!("set schema_version: {}", e)))?;
            }
            Some(version) if version < SCHEMA_VERSION => {
                // Future migrations go here, additive only.
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|e| StoreError::Storage(format!("set schema_version: {}", e)))?;
            }
            Some(_) => {}
        }

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn record_id(record: &Value) -> Result<&str, StoreError> {
        record
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(StoreError::InvalidRecord)
    }

    fn put_record(conn: &Connection, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let id = Self::record_id(record)?;
        let body = serde_json::to_string(record)?;
        conn.execute(
            "INSERT OR REPLACE INTO records (collection, id, body) VALUES (?1, ?2, ?3)",
            params![collection.as_str(), id, body],
        )
        .map_err(|e| StoreError::Storage(format!("put: {}", e)))?;
        Ok(())
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<QueueEntry, StoreError> {
        let id: i64 = row
            .get(0)
            .map_err(|e| StoreError::Storage(format!("row id: {}", e)))?;
        let action_str: String = row
            .get(1)
            .map_err(|e| StoreError::Storage(format!("row action: {}", e)))?;
        let entity_str: String = row
            .get(2)
            .map_err(|e| StoreError::Storage(format!("row entity: {}", e)))?;
        let data_json: String = row
            .get(3)
            .map_err(|e| StoreError::Storage(format!("row data: {}", e)))?;
        let local_id: Option<String> = row
            .get(4)
            .map_err(|e| StoreError::Storage(format!("row local_id: {}", e)))?;
        let timestamp: i64 = row
            .get(5)
            .map_err(|e| StoreError::Storage(format!("row timestamp: {}", e)))?;
        let synced: bool = row
            .get(6)
            .map_err(|e| StoreError::Storage(format!("row synced: {}", e)))?;

        Ok(QueueEntry {
            id,
            action: QueueAction::parse(&action_str)?,
            entity: Collection::parse(&entity_str)?,
            data: serde_json::from_str(&data_json)?,
            local_id,
            timestamp,
            synced,
        })
    }
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.lock()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Storage(format!("get: {}", e)))?;
        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY id")
            .map_err(|e| StoreError::Storage(format!("prepare get_all: {}", e)))?;
        let bodies = stmt
            .query_map(params![collection.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Storage(format!("get_all: {}", e)))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| StoreError::Storage(format!("collect get_all: {}", e)))?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(StoreError::from))
            .collect()
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let conn = self.lock()?;
        Self::put_record(&conn, collection, record)
    }

    fn put_all(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {}", e)))?;
        for record in records {
            Self::put_record(&tx, collection, record)?;
        }
        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {}", e)))?;
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )
        .map_err(|e| StoreError::Storage(format!("delete: {}", e)))?;
        Ok(())
    }

    fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM records WHERE collection = ?1",
            params![collection.as_str()],
        )
        .map_err(|e| StoreError::Storage(format!("clear: {}", e)))?;
        Ok(())
    }

    fn enqueue(
        &self,
        action: QueueAction,
        entity: Collection,
        data: Value,
        local_id: Option<String>,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let data_json = serde_json::to_string(&data)?;
        conn.execute(
            "INSERT INTO sync_queue (action, entity, data, local_id, timestamp, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                action.as_str(),
                entity.as_str(),
                data_json,
                local_id,
                Utc::now().timestamp_millis(),
            ],
        )
        .map_err(|e| StoreError::Storage(format!("enqueue: {}", e)))?;
        Ok(conn.last_insert_rowid())
    }

    fn queue_entries(&self) -> Result<Vec<QueueEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, action, entity, data, local_id, timestamp, synced
                 FROM sync_queue ORDER BY id",
            )
            .map_err(|e| StoreError::Storage(format!("prepare queue: {}", e)))?;
        let rows = stmt
            .query_map([], |row| Ok(Self::row_to_entry(row)))
            .map_err(|e| StoreError::Storage(format!("queue: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            let entry = row.map_err(|e| StoreError::Storage(format!("row: {}", e)))?;
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn mark_synced(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("UPDATE sync_queue SET synced = 1 WHERE id = ?1", params![id])
            .map_err(|e| StoreError::Storage(format!("mark_synced: {}", e)))?;
        Ok(())
    }

    fn remap_queue_target(
        &self,
        entity: Collection,
        from: &str,
        to: &str,
    ) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::Storage(format!("begin tx: {}", e)))?;

        let rows: Vec<(i64, String)> = {
            let mut stmt = tx
                .prepare("SELECT id, data FROM sync_queue WHERE entity = ?1 AND synced = 0")
                .map_err(|e| StoreError::Storage(format!("prepare remap: {}", e)))?;
            let rows = stmt
                .query_map(params![entity.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .map_err(|e| StoreError::Storage(format!("remap: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::Storage(format!("collect remap: {}", e)))?;
            rows
        };

        let mut changed = 0;
        for (id, data_json) in rows {
            let mut data: Value = serde_json::from_str(&data_json)?;
            if data.get("id").and_then(Value::as_str) != Some(from) {
                continue;
            }
            data["id"] = Value::String(to.to_string());
            tx.execute(
                "UPDATE sync_queue SET data = ?1 WHERE id = ?2",
                params![serde_json::to_string(&data)?, id],
            )
            .map_err(|e| StoreError::Storage(format!("remap update: {}", e)))?;
            changed += 1;
        }

        tx.commit()
            .map_err(|e| StoreError::Storage(format!("commit: {}", e)))?;
        Ok(changed)
    }

    fn purge_synced(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM sync_queue WHERE synced = 1", [])
            .map_err(|e| StoreError::Storage(format!("purge_synced: {}", e)))?;
        Ok(removed)
    }

    fn clear_queue(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM sync_queue", [])
            .map_err(|e| StoreError::Storage(format!("clear_queue: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn building(id: &str, name: &str) -> Value {
        json!({"id": id, "name": name, "city": "Brussels"})
    }

    #[test]
    fn put_and_get_round_trip() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        let record = building("b-1", "Residence A");
        store.put(Collection::Buildings, &record).unwrap();
        let got = store.get(Collection::Buildings, "b-1").unwrap().unwrap();
        assert_eq!(got, record);
    }

    #[test]
    fn get_absent_returns_none() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        assert!(store.get(Collection::Buildings, "missing").unwrap().is_none());
    }

    #[test]
    fn put_replaces_existing_record() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store
            .put(Collection::Owners, &json!({"id": "o-1", "email": "a@x.be"}))
            .unwrap();
        store
            .put(Collection::Owners, &json!({"id": "o-1", "email": "b@x.be"}))
            .unwrap();
        let all = store.get_all(Collection::Owners).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["email"], "b@x.be");
    }

    #[test]
    fn put_without_id_fails() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        let err = store
            .put(Collection::Buildings, &json!({"name": "No id"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord));
    }

    #[test]
    fn put_all_writes_batch() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        let records: Vec<Value> = (0..10)
            .map(|i| building(&format!("b-{}", i), &format!("Building {}", i)))
            .collect();
        store.put_all(Collection::Buildings, &records).unwrap();
        assert_eq!(store.get_all(Collection::Buildings).unwrap().len(), 10);
    }

    #[test]
    fn delete_absent_is_ok() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store.delete(Collection::Units, "missing").unwrap();
    }

    #[test]
    fn clear_empties_only_that_collection() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store.put(Collection::Buildings, &building("b-1", "A")).unwrap();
        store
            .put(Collection::Owners, &json!({"id": "o-1", "email": "a@x.be"}))
            .unwrap();
        store.clear(Collection::Buildings).unwrap();
        assert!(store.get_all(Collection::Buildings).unwrap().is_empty());
        assert_eq!(store.get_all(Collection::Owners).unwrap().len(), 1);
    }

    #[test]
    fn queue_preserves_insertion_order() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store
            .enqueue(QueueAction::Create, Collection::Buildings, json!({"name": "1"}), None)
            .unwrap();
        store
            .enqueue(QueueAction::Update, Collection::Owners, json!({"id": "o-1"}), None)
            .unwrap();
        store
            .enqueue(QueueAction::Delete, Collection::Units, json!({"id": "u-1"}), None)
            .unwrap();

        let entries = store.queue_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(entries[0].action, QueueAction::Create);
        assert_eq!(entries[1].entity, Collection::Owners);
        assert_eq!(entries[2].action, QueueAction::Delete);
        assert!(entries.iter().all(|e| !e.synced));
    }

    #[test]
    fn mark_synced_then_purge_removes_only_synced() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        let first = store
            .enqueue(QueueAction::Create, Collection::Buildings, json!({"name": "1"}), None)
            .unwrap();
        store
            .enqueue(QueueAction::Create, Collection::Buildings, json!({"name": "2"}), None)
            .unwrap();

        store.mark_synced(first).unwrap();
        let purged = store.purge_synced().unwrap();
        assert_eq!(purged, 1);

        let remaining = store.queue_entries().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].data["name"], "2");
        assert!(!remaining[0].synced);
    }

    #[test]
    fn mark_synced_missing_entry_is_ok() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store.mark_synced(999).unwrap();
    }

    #[test]
    fn remap_rewrites_only_matching_unsynced_targets() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store
            .enqueue(
                QueueAction::Update,
                Collection::Buildings,
                json!({"id": "temp-1", "name": "A"}),
                None,
            )
            .unwrap();
        store
            .enqueue(QueueAction::Delete, Collection::Buildings, json!({"id": "temp-1"}), None)
            .unwrap();
        // Same target on another collection, and another target on the
        // same collection: both untouched.
        store
            .enqueue(QueueAction::Update, Collection::Owners, json!({"id": "temp-1"}), None)
            .unwrap();
        store
            .enqueue(QueueAction::Update, Collection::Buildings, json!({"id": "b-9"}), None)
            .unwrap();
        // Already-synced entries are history, not pending work.
        let synced = store
            .enqueue(QueueAction::Update, Collection::Buildings, json!({"id": "temp-1"}), None)
            .unwrap();
        store.mark_synced(synced).unwrap();

        let changed = store
            .remap_queue_target(Collection::Buildings, "temp-1", "srv-7")
            .unwrap();
        assert_eq!(changed, 2);

        let entries = store.queue_entries().unwrap();
        assert_eq!(entries[0].target_id(), Some("srv-7"));
        assert_eq!(entries[0].data["name"], "A");
        assert_eq!(entries[1].target_id(), Some("srv-7"));
        assert_eq!(entries[2].target_id(), Some("temp-1"));
        assert_eq!(entries[3].target_id(), Some("b-9"));
        assert_eq!(entries[4].target_id(), Some("temp-1"));
    }

    #[test]
    fn enqueue_keeps_local_id() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store
            .enqueue(
                QueueAction::Create,
                Collection::Buildings,
                json!({"name": "Offline"}),
                Some("temp-abc".into()),
            )
            .unwrap();
        let entries = store.queue_entries().unwrap();
        assert_eq!(entries[0].local_id.as_deref(), Some("temp-abc"));
    }

    #[test]
    fn reopen_preserves_records_and_pending_queue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.db");

        {
            let store = SqliteLocalStore::open(&path).unwrap();
            store.put(Collection::Buildings, &building("b-1", "A")).unwrap();
            store
                .enqueue(QueueAction::Create, Collection::Owners, json!({"name": "O"}), None)
                .unwrap();
        }

        let store = SqliteLocalStore::open(&path).unwrap();
        assert_eq!(store.get_all(Collection::Buildings).unwrap().len(), 1);
        let entries = store.queue_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].synced);
    }

    #[test]
    fn double_open_keeps_single_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strata.db");

        let first = SqliteLocalStore::open(&path).unwrap();
        let second = SqliteLocalStore::open(&path).unwrap();

        first.put(Collection::Buildings, &building("b-1", "A")).unwrap();
        assert_eq!(second.get_all(Collection::Buildings).unwrap().len(), 1);

        let conn = second.conn.lock().unwrap();
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn clear_queue_drops_pending_entries() {
        let store = SqliteLocalStore::open_in_memory().unwrap();
        store
            .enqueue(QueueAction::Create, Collection::Buildings, json!({"name": "1"}), None)
            .unwrap();
        store.clear_queue().unwrap();
        assert!(store.queue_entries().unwrap().is_empty());
    }
}

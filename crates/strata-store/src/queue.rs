use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::Collection;
use crate::error::StoreError;

/// The kind of mutation a queue entry defers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Create,
    Update,
    Delete,
}

impl QueueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::Create => "create",
            QueueAction::Update => "update",
            QueueAction::Delete => "delete",
        }
    }

    pub fn parse(name: &str) -> Result<Self, StoreError> {
        match name {
            "create" => Ok(QueueAction::Create),
            "update" => Ok(QueueAction::Update),
            "delete" => Ok(QueueAction::Delete),
            other => Err(StoreError::UnknownAction(other.to_string())),
        }
    }
}

impl std::fmt::Display for QueueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending mutation, not yet confirmed by the server.
///
/// Entries are appended in the order mutations were issued and replayed
/// oldest-first, so a create is never attempted after a later update to the
/// same not-yet-existing identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Store-assigned surrogate key (auto-incrementing), not the entity id.
    pub id: i64,
    pub action: QueueAction,
    /// Target collection.
    pub entity: Collection,
    /// Full entity body for create/update; at least `{id}` for delete.
    pub data: Value,
    /// Temporary identifier of the optimistic record a deferred create
    /// wrote locally. Lets the drain delete the placeholder once the server
    /// assigns the canonical id.
    pub local_id: Option<String>,
    /// Creation time, milliseconds since epoch.
    pub timestamp: i64,
    /// Set once replay succeeded; purged at the end of the drain.
    pub synced: bool,
}

impl QueueEntry {
    /// Entity identifier carried in the payload (update/delete targets).
    pub fn target_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_parse_round_trip() {
        for action in [QueueAction::Create, QueueAction::Update, QueueAction::Delete] {
            assert_eq!(QueueAction::parse(action.as_str()).unwrap(), action);
        }
        assert!(matches!(
            QueueAction::parse("upsert"),
            Err(StoreError::UnknownAction(_))
        ));
    }

    #[test]
    fn target_id_reads_payload_id() {
        let entry = QueueEntry {
            id: 1,
            action: QueueAction::Delete,
            entity: Collection::Buildings,
            data: json!({"id": "b-1"}),
            local_id: None,
            timestamp: 0,
            synced: false,
        };
        assert_eq!(entry.target_id(), Some("b-1"));

        let no_id = QueueEntry {
            data: json!({"name": "no id here"}),
            ..entry
        };
        assert_eq!(no_id.target_id(), None);
    }
}

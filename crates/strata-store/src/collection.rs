use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Named record collections held by the local store.
///
/// Collection names double as the remote API's path segments
/// (`GET /buildings`, `POST /owners`, ...), so `as_str` must match the
/// backend routes exactly. The sync queue is not a collection: it lives in
/// its own table with a store-assigned surrogate key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Buildings,
    Owners,
    Units,
    Expenses,
    Documents,
    Notifications,
}

impl Collection {
    /// Every collection, in the order logout clears them.
    pub const ALL: [Collection; 7] = [
        Collection::Users,
        Collection::Buildings,
        Collection::Owners,
        Collection::Units,
        Collection::Expenses,
        Collection::Documents,
        Collection::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Buildings => "buildings",
            Collection::Owners => "owners",
            Collection::Units => "units",
            Collection::Expenses => "expenses",
            Collection::Documents => "documents",
            Collection::Notifications => "notifications",
        }
    }

    pub fn parse(name: &str) -> Result<Self, StoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_collection() {
        for collection in Collection::ALL {
            assert_eq!(Collection::parse(collection.as_str()).unwrap(), collection);
        }
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = Collection::parse("sync_queue").unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }
}

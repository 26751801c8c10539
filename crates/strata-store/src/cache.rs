use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use crate::error::StoreError;
use crate::queue::QueueAction;
use crate::records::Entity;
use crate::store::LocalStore;

/// Typed per-entity facade over the local store.
///
/// Pure cache access plus a queue-enqueue helper for deferred writes; no
/// network fallback of its own. Entities the sync engine covers with
/// read-through/write-through accessors (buildings, owners, expenses) use
/// those instead.
pub struct EntityCache<E, S> {
    store: Arc<S>,
    _entity: PhantomData<E>,
}

impl<E: Entity, S: LocalStore> EntityCache<E, S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.store
            .get(E::COLLECTION, id)?
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .transpose()
    }

    pub fn get_all(&self) -> Result<Vec<E>, StoreError> {
        self.store
            .get_all(E::COLLECTION)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    pub fn save(&self, entity: &E) -> Result<(), StoreError> {
        let value = serde_json::to_value(entity)?;
        self.store.put(E::COLLECTION, &value)
    }

    pub fn save_all(&self, entities: &[E]) -> Result<(), StoreError> {
        let values = entities
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        self.store.put_all(E::COLLECTION, &values)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(E::COLLECTION, id)
    }

    /// Queue a mutation for the next drain without touching the cache.
    pub fn defer(&self, action: QueueAction, data: Value) -> Result<i64, StoreError> {
        self.store.enqueue(action, E::COLLECTION, data, None)
    }
}

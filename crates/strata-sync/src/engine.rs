use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::RemoteApi;
use crate::connectivity::ConnectivityMonitor;
use crate::error::Result;
use strata_store::{
    Building, Collection, Entity, Expense, LocalStore, Owner, QueueAction, QueueEntry,
    StoreError, Unit,
};

/// Prefix distinguishing client-synthesized identifiers from server ids.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Whether an identifier is a client-synthesized placeholder still waiting
/// for its server-assigned replacement.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

fn temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4())
}

/// Collections refresh-pulled after every drain. Units and expenses are
/// included so their caches do not go stale between accessor calls.
const REFRESH_COLLECTIONS: [Collection; 4] = [
    Collection::Buildings,
    Collection::Owners,
    Collection::Units,
    Collection::Expenses,
];

/// Orchestrates queue draining against the remote API and refresh of
/// canonical entity state into the local store.
///
/// Explicitly constructed with its collaborators injected; the bearer token
/// arrives through `set_token` and its absence short-circuits every network
/// path to offline behavior. At most one drain runs at a time: a `sync()`
/// arriving while one is in progress is a no-op, not queued — the next
/// online transition or manual trigger picks up whatever remains.
pub struct SyncEngine<S, A> {
    store: Arc<S>,
    api: Arc<A>,
    monitor: Arc<ConnectivityMonitor>,
    token: RwLock<Option<String>>,
    draining: AtomicBool,
}

impl<S: LocalStore, A: RemoteApi> SyncEngine<S, A> {
    pub fn new(store: Arc<S>, api: Arc<A>, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self {
            store,
            api,
            monitor,
            token: RwLock::new(None),
            draining: AtomicBool::new(false),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    /// Current token, but only when the session is online.
    fn ready(&self) -> Option<String> {
        if self.monitor.is_online() {
            self.token()
        } else {
            None
        }
    }

    /// Set the token and, when online, run a first drain. Called on login.
    pub async fn initialize(&self, token: impl Into<String>) -> Result<()> {
        self.set_token(Some(token.into()));
        if self.monitor.is_online() {
            self.sync().await
        } else {
            Ok(())
        }
    }

    /// Drop the token and empty every collection, the sync queue included.
    /// Called on logout.
    pub fn clear_local_data(&self) -> Result<()> {
        self.set_token(None);
        for collection in Collection::ALL {
            self.store.clear(collection)?;
        }
        self.store.clear_queue()?;
        Ok(())
    }

    /// Drain pending mutations and refresh-pull canonical state.
    ///
    /// Returns without effect unless online with a token. One queue
    /// entry's failure never blocks later entries or aborts the drain;
    /// only queue enumeration/purge failures surface as errors.
    pub async fn sync(&self) -> Result<()> {
        let Some(token) = self.ready() else {
            return Ok(());
        };
        if self.draining.swap(true, Ordering::AcqRel) {
            tracing::debug!("sync already in progress, skipping");
            return Ok(());
        }

        tracing::info!("starting synchronization");
        let result = self.drain(&token).await;
        self.draining.store(false, Ordering::Release);
        result
    }

    async fn drain(&self, token: &str) -> Result<()> {
        let mut pending: Vec<QueueEntry> = self
            .store
            .queue_entries()?
            .into_iter()
            .filter(|entry| !entry.synced)
            .collect();

        for idx in 0..pending.len() {
            let entry = pending[idx].clone();
            match self.replay(&entry, token).await {
                Ok(Some((from, to))) => {
                    self.remap_pending(&mut pending[idx + 1..], entry.entity, &from, &to);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        "failed to sync {} on {} (entry {}): {}",
                        entry.action,
                        entry.entity,
                        entry.id,
                        err
                    );
                }
            }
        }

        let purged = self.store.purge_synced()?;
        tracing::debug!("drained {} entries, purged {}", pending.len(), purged);

        self.refresh(token).await;
        tracing::info!("synchronization complete");
        Ok(())
    }

    /// Replay one entry. A successfully reconciled create returns the
    /// temp-to-canonical id mapping so queued mutations against the temp id
    /// can follow.
    async fn replay(&self, entry: &QueueEntry, token: &str) -> Result<Option<(String, String)>> {
        match entry.action {
            QueueAction::Create => {
                let record = self.api.create(entry.entity, &entry.data, token).await?;
                self.store.mark_synced(entry.id)?;
                self.reconcile_create(entry, &record)
            }
            QueueAction::Update => {
                let id = entry.target_id().ok_or(StoreError::InvalidRecord)?;
                let record = self.api.update(entry.entity, id, &entry.data, token).await?;
                self.store.mark_synced(entry.id)?;
                if record.get("id").is_some() {
                    self.store.put(entry.entity, &record)?;
                }
                Ok(None)
            }
            QueueAction::Delete => {
                let id = entry.target_id().ok_or(StoreError::InvalidRecord)?;
                self.api.delete(entry.entity, id, token).await?;
                self.store.mark_synced(entry.id)?;
                self.store.delete(entry.entity, id)?;
                Ok(None)
            }
        }
    }

    /// Replace the optimistic temp-id record with the server-confirmed one
    /// once a deferred create has replayed.
    fn reconcile_create(
        &self,
        entry: &QueueEntry,
        record: &Value,
    ) -> Result<Option<(String, String)>> {
        let canonical = record.get("id").and_then(Value::as_str);
        if let (Some(local_id), Some(canonical)) = (&entry.local_id, canonical) {
            self.store.put(entry.entity, record)?;
            if canonical != local_id {
                self.store.delete(entry.entity, local_id)?;
                return Ok(Some((local_id.clone(), canonical.to_string())));
            }
        }
        Ok(None)
    }

    /// Redirect queued mutations that still target a reconciled temp id:
    /// both the persisted rows and the rest of this drain's snapshot.
    fn remap_pending(&self, later: &mut [QueueEntry], entity: Collection, from: &str, to: &str) {
        for entry in later {
            if entry.entity == entity && entry.target_id() == Some(from) {
                entry.data["id"] = Value::String(to.to_string());
            }
        }
        if let Err(err) = self.store.remap_queue_target(entity, from, to) {
            tracing::warn!("failed to remap queued {} ids: {}", entity, err);
        }
    }

    /// Pull fresh canonical collections into the store. Failures are
    /// logged per collection and never roll back the drain.
    async fn refresh(&self, token: &str) {
        for collection in REFRESH_COLLECTIONS {
            match self.api.fetch_all(collection, token).await {
                Ok(records) => {
                    if let Err(err) = self.store.put_all(collection, &records) {
                        tracing::warn!("failed to cache refreshed {}: {}", collection, err);
                    }
                }
                Err(err) => {
                    tracing::warn!("failed to refresh {}: {}", collection, err);
                }
            }
        }
    }

    /// Watch connectivity transitions and drain on each reconnect.
    /// Fire-and-forget: failures are logged, never propagated. The session
    /// spawns this once alongside the engine. The monitor only notifies on
    /// actual transitions, so every observed `true` is a reconnect even if
    /// this task was not yet polling when the flag flipped.
    pub async fn drain_on_reconnect(&self, mut rx: watch::Receiver<bool>) {
        while rx.changed().await.is_ok() {
            if *rx.borrow_and_update() {
                if let Err(err) = self.sync().await {
                    tracing::warn!("automatic sync after reconnect failed: {}", err);
                }
            }
        }
    }

    // ==================== Read-through accessors ====================

    /// Prefer the network, mirror results into the cache; on any failure
    /// (offline, no token, network error) return the cached contents. An
    /// empty cache yields an empty collection, never an error.
    pub async fn fetch_entities<E: Entity>(&self) -> Result<Vec<E>> {
        if let Some(token) = self.ready() {
            match self.api.fetch_all(E::COLLECTION, &token).await {
                Ok(records) => {
                    self.store.put_all(E::COLLECTION, &records)?;
                    return parse_records(records);
                }
                Err(err) => {
                    tracing::debug!(
                        "fetching {} failed, falling back to local data: {}",
                        E::COLLECTION,
                        err
                    );
                }
            }
        }
        parse_records(self.store.get_all(E::COLLECTION)?)
    }

    pub async fn get_buildings(&self) -> Result<Vec<Building>> {
        self.fetch_entities().await
    }

    pub async fn get_owners(&self) -> Result<Vec<Owner>> {
        self.fetch_entities().await
    }

    pub async fn get_units(&self) -> Result<Vec<Unit>> {
        self.fetch_entities().await
    }

    pub async fn get_expenses(&self) -> Result<Vec<Expense>> {
        self.fetch_entities().await
    }

    // ==================== Write-through accessors ====================

    /// Prefer a direct POST; on any failure queue the mutation, write an
    /// optimistic temp-id record and return it so the UI can proceed.
    pub async fn create_entity<E: Entity>(&self, mut draft: Value) -> Result<E> {
        if !draft.is_object() {
            return Err(StoreError::InvalidRecord.into());
        }

        if let Some(token) = self.ready() {
            match self.api.create(E::COLLECTION, &draft, &token).await {
                Ok(record) => {
                    self.store.put(E::COLLECTION, &record)?;
                    return parse_record(record);
                }
                Err(err) => {
                    tracing::warn!(
                        "creating {} failed, queueing for later sync: {}",
                        E::COLLECTION,
                        err
                    );
                }
            }
        }

        let local_id = temp_id();
        self.store.enqueue(
            QueueAction::Create,
            E::COLLECTION,
            draft.clone(),
            Some(local_id.clone()),
        )?;

        if let Some(fields) = draft.as_object_mut() {
            fields.insert("id".to_string(), Value::String(local_id));
            fields
                .entry("created_at".to_string())
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        }
        self.store.put(E::COLLECTION, &draft)?;
        parse_record(draft)
    }

    /// Prefer a direct PUT; on any failure queue the mutation and apply it
    /// to the cache optimistically.
    pub async fn update_entity<E: Entity>(&self, entity: &E) -> Result<E> {
        let body = serde_json::to_value(entity).map_err(StoreError::from)?;

        if let Some(token) = self.ready() {
            match self.api.update(E::COLLECTION, entity.id(), &body, &token).await {
                Ok(record) => {
                    self.store.put(E::COLLECTION, &record)?;
                    return parse_record(record);
                }
                Err(err) => {
                    tracing::warn!(
                        "updating {} failed, queueing for later sync: {}",
                        E::COLLECTION,
                        err
                    );
                }
            }
        }

        self.store
            .enqueue(QueueAction::Update, E::COLLECTION, body.clone(), None)?;
        self.store.put(E::COLLECTION, &body)?;
        parse_record(body)
    }

    /// Prefer a direct DELETE; on any failure queue the mutation. Either
    /// way the record disappears from the cache immediately.
    pub async fn delete_entity<E: Entity>(&self, id: &str) -> Result<()> {
        let mut deferred = true;
        if let Some(token) = self.ready() {
            match self.api.delete(E::COLLECTION, id, &token).await {
                Ok(()) => deferred = false,
                Err(err) => {
                    tracing::warn!(
                        "deleting {} failed, queueing for later sync: {}",
                        E::COLLECTION,
                        err
                    );
                }
            }
        }

        if deferred {
            self.store.enqueue(
                QueueAction::Delete,
                E::COLLECTION,
                serde_json::json!({ "id": id }),
                None,
            )?;
        }
        self.store.delete(E::COLLECTION, id)?;
        Ok(())
    }

    pub async fn create_building(&self, draft: Value) -> Result<Building> {
        self.create_entity(draft).await
    }

    pub async fn update_building(&self, building: &Building) -> Result<Building> {
        self.update_entity(building).await
    }

    pub async fn delete_building(&self, id: &str) -> Result<()> {
        self.delete_entity::<Building>(id).await
    }

    pub async fn create_owner(&self, draft: Value) -> Result<Owner> {
        self.create_entity(draft).await
    }

    pub async fn create_expense(&self, draft: Value) -> Result<Expense> {
        self.create_entity(draft).await
    }
}

fn parse_record<E: Entity>(record: Value) -> Result<E> {
    Ok(serde_json::from_value(record).map_err(StoreError::from)?)
}

fn parse_records<E: Entity>(records: Vec<Value>) -> Result<Vec<E>> {
    records.into_iter().map(parse_record).collect()
}

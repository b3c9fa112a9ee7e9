//! The ledger store interface and its in-memory implementation.
//!
//! Storage is the sole point of mutual exclusion for per-actor state: the
//! record carries a version, and [`LucidityStore::save_adjustment`] commits
//! only when the caller's version still matches, so two concurrent
//! read-modify-write cycles cannot interleave. The live implementation
//! (`murkveil-store`) backs this with `PostgreSQL` and `Dragonfly`; the
//! [`MemoryStore`] here backs tests and local runs.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use murkveil_types::{ActorId, AdjustmentLogEntry, ExposureState, LucidityRecord};

use crate::error::StoreError;

/// Durable storage consumed by the engine, gateway, and scheduler.
///
/// CRUD only — no business logic. Implementations must make
/// `save_adjustment` atomic (record and log entry persist together or not
/// at all) and must reject saves whose record version is stale with
/// [`StoreError::Conflict`].
pub trait LucidityStore: Send + Sync + 'static {
    /// Load the actor's record, creating a fresh one (score 100, stable)
    /// if none exists.
    fn get_or_create(
        &self,
        actor_id: ActorId,
    ) -> impl Future<Output = Result<LucidityRecord, StoreError>> + Send;

    /// Atomically persist an updated record together with its adjustment
    /// log entry. Fails with [`StoreError::Conflict`] when the stored
    /// version no longer matches `record.version`.
    fn save_adjustment(
        &self,
        record: &LucidityRecord,
        entry: &AdjustmentLogEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Read the exposure state for an (actor, archetype) pair.
    fn get_exposure(
        &self,
        actor_id: ActorId,
        archetype: &str,
    ) -> impl Future<Output = Result<Option<ExposureState>, StoreError>> + Send;

    /// Increment the exposure counter for an (actor, archetype) pair and
    /// return the new count. The counter is monotonic and never decays.
    fn increment_exposure(
        &self,
        actor_id: ActorId,
        archetype: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// Read the cooldown expiry for an (actor, action) pair. Absence
    /// means "not on cooldown".
    fn get_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, StoreError>> + Send;

    /// Overwrite the cooldown expiry for an (actor, action) pair.
    /// Last write wins under concurrent callers.
    fn set_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List actors eligible for flux: active since `active_since`, or
    /// created since `created_since` (covers newly-joined actors whose
    /// activity timestamp has not been refreshed yet).
    fn list_active_actors(
        &self,
        active_since: DateTime<Utc>,
        created_since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ActorId>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Inner state of the memory store, behind one mutex.
#[derive(Debug, Default)]
struct MemoryState {
    records: BTreeMap<ActorId, LucidityRecord>,
    log: Vec<AdjustmentLogEntry>,
    exposure: BTreeMap<(ActorId, String), ExposureState>,
    cooldowns: BTreeMap<(ActorId, String), DateTime<Utc>>,
    last_active: BTreeMap<ActorId, DateTime<Utc>>,
    created: BTreeMap<ActorId, DateTime<Utc>>,
}

/// In-memory [`LucidityStore`] for tests and local runs.
///
/// The mutex is never held across an await point; all operations are
/// short synchronous critical sections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record activity for an actor. In production the session layer owns
    /// this timestamp; tests drive it directly.
    pub fn record_activity(&self, actor_id: ActorId, at: DateTime<Utc>) {
        self.lock().last_active.insert(actor_id, at);
    }

    /// Return a copy of the adjustment log, in append order.
    pub fn adjustment_log(&self) -> Vec<AdjustmentLogEntry> {
        self.lock().log.clone()
    }

    /// Return a copy of the actor's record, if one exists.
    pub fn record(&self, actor_id: ActorId) -> Option<LucidityRecord> {
        self.lock().records.get(&actor_id).cloned()
    }
}

impl LucidityStore for MemoryStore {
    async fn get_or_create(&self, actor_id: ActorId) -> Result<LucidityRecord, StoreError> {
        let mut state = self.lock();
        state.created.entry(actor_id).or_insert_with(Utc::now);
        Ok(state
            .records
            .entry(actor_id)
            .or_insert_with(|| LucidityRecord::fresh(actor_id))
            .clone())
    }

    async fn save_adjustment(
        &self,
        record: &LucidityRecord,
        entry: &AdjustmentLogEntry,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        let stored_version = state.records.get(&record.actor_id).map(|r| r.version);
        if stored_version != Some(record.version) {
            return Err(StoreError::Conflict {
                actor_id: record.actor_id,
            });
        }

        let mut saved = record.clone();
        saved.version = saved.version.saturating_add(1);
        state.records.insert(record.actor_id, saved);
        state.log.push(entry.clone());
        Ok(())
    }

    async fn get_exposure(
        &self,
        actor_id: ActorId,
        archetype: &str,
    ) -> Result<Option<ExposureState>, StoreError> {
        Ok(self
            .lock()
            .exposure
            .get(&(actor_id, archetype.to_owned()))
            .copied())
    }

    async fn increment_exposure(
        &self,
        actor_id: ActorId,
        archetype: &str,
        at: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let mut state = self.lock();
        let entry = state
            .exposure
            .entry((actor_id, archetype.to_owned()))
            .or_insert(ExposureState {
                encounter_count: 0,
                last_encounter_at: at,
            });
        entry.encounter_count = entry.encounter_count.saturating_add(1);
        entry.last_encounter_at = at;
        Ok(entry.encounter_count)
    }

    async fn get_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .lock()
            .cooldowns
            .get(&(actor_id, action.to_owned()))
            .copied())
    }

    async fn set_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.lock()
            .cooldowns
            .insert((actor_id, action.to_owned()), expires_at);
        Ok(())
    }

    async fn list_active_actors(
        &self,
        active_since: DateTime<Utc>,
        created_since: DateTime<Utc>,
    ) -> Result<Vec<ActorId>, StoreError> {
        let state = self.lock();
        let mut actors: Vec<ActorId> = state
            .last_active
            .keys()
            .chain(state.created.keys())
            .filter(|actor_id| {
                let active = state
                    .last_active
                    .get(actor_id)
                    .is_some_and(|at| *at >= active_since);
                let newcomer = state
                    .created
                    .get(actor_id)
                    .is_some_and(|at| *at >= created_since);
                active || newcomer
            })
            .copied()
            .collect();
        actors.sort_unstable();
        actors.dedup();
        Ok(actors)
    }
}

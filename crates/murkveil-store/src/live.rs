//! The live [`LucidityStore`]: `PostgreSQL` records + `Dragonfly` cooldowns.
//!
//! Per-actor serialization is enforced here: `save_adjustment` runs a
//! versioned `UPDATE` and the adjustment-log `INSERT` in one transaction.
//! A stale version updates zero rows, the transaction rolls back, and the
//! caller sees [`StoreError::Conflict`].
//!
//! Every call is wrapped in a bounded timeout; expiry surfaces as the
//! transient [`StoreError::Timeout`] so callers can retry.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use murkveil_lucidity::{LucidityStore, StoreError};
use murkveil_types::{
    ActorId, AdjustmentLogEntry, AdjustmentSource, ExposureState, Liability, LucidityRecord,
    LucidityTier, STARTING_SCORE,
};

use crate::dragonfly::DragonflyPool;
use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Default bound on any single storage call.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

/// Production [`LucidityStore`] backed by `PostgreSQL` and `Dragonfly`.
#[derive(Clone)]
pub struct LiveStore {
    pg: PostgresPool,
    hot: DragonflyPool,
    call_timeout: Duration,
}

impl LiveStore {
    /// Create a store over connected pools.
    pub const fn new(pg: PostgresPool, hot: DragonflyPool) -> Self {
        Self {
            pg,
            hot,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Run a storage future under the bounded timeout, mapping errors
    /// into the trait-level taxonomy.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, DbError>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(map_db_error(operation, &error)),
            Err(_) => Err(StoreError::Timeout { operation }),
        }
    }
}

/// Map a [`DbError`] into the trait-level [`StoreError`].
fn map_db_error(operation: &'static str, error: &DbError) -> StoreError {
    match error {
        DbError::Serialization(e) => StoreError::Corrupt {
            message: format!("{operation}: {e}"),
        },
        DbError::Corrupt(message) => StoreError::Corrupt {
            message: format!("{operation}: {message}"),
        },
        other => StoreError::Unavailable {
            message: format!("{operation}: {other}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Enum codecs
// ---------------------------------------------------------------------------

/// Convert a [`LucidityTier`] to its database string.
const fn tier_to_db(tier: LucidityTier) -> &'static str {
    match tier {
        LucidityTier::Stable => "stable",
        LucidityTier::Uneasy => "uneasy",
        LucidityTier::Fractured => "fractured",
        LucidityTier::Deranged => "deranged",
        LucidityTier::Terminal => "terminal",
    }
}

/// Parse a database string into a [`LucidityTier`].
fn tier_from_db(value: &str) -> Result<LucidityTier, DbError> {
    match value {
        "stable" => Ok(LucidityTier::Stable),
        "uneasy" => Ok(LucidityTier::Uneasy),
        "fractured" => Ok(LucidityTier::Fractured),
        "deranged" => Ok(LucidityTier::Deranged),
        "terminal" => Ok(LucidityTier::Terminal),
        other => Err(DbError::Corrupt(format!("unknown tier: {other}"))),
    }
}

/// Convert an [`AdjustmentSource`] to its database string.
const fn source_to_db(source: AdjustmentSource) -> &'static str {
    match source {
        AdjustmentSource::PassiveFlux => "passive_flux",
        AdjustmentSource::Encounter => "encounter",
        AdjustmentSource::Recovery => "recovery",
        AdjustmentSource::System => "system",
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Decode a `lucidity_records` row.
fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<LucidityRecord, DbError> {
    let actor_id: Uuid = row.try_get("actor_id")?;
    let score: i32 = row.try_get("score")?;
    let tier: String = row.try_get("tier")?;
    let liabilities_json: String = row.try_get("liabilities")?;
    let catatonia_entered_at: Option<DateTime<Utc>> = row.try_get("catatonia_entered_at")?;
    let version: i64 = row.try_get("version")?;

    let liabilities: Vec<Liability> = serde_json::from_str(&liabilities_json)?;
    Ok(LucidityRecord {
        actor_id: ActorId::from(actor_id),
        score,
        tier: tier_from_db(&tier)?,
        liabilities,
        catatonia_entered_at,
        version: u64::try_from(version).unwrap_or(0),
    })
}

impl LucidityStore for LiveStore {
    async fn get_or_create(&self, actor_id: ActorId) -> Result<LucidityRecord, StoreError> {
        let pool = self.pg.pool().clone();
        self.bounded("get_or_create", async move {
            sqlx::query(
                r"INSERT INTO lucidity_records (actor_id, score, tier, liabilities, catatonia_entered_at, version)
                  VALUES ($1, $2, $3, '[]'::jsonb, NULL, 0)
                  ON CONFLICT (actor_id) DO NOTHING",
            )
            .bind(actor_id.into_inner())
            .bind(STARTING_SCORE)
            .bind(tier_to_db(LucidityTier::Stable))
            .execute(&pool)
            .await?;

            let row = sqlx::query(
                r"SELECT actor_id, score, tier, liabilities::text AS liabilities, catatonia_entered_at, version
                  FROM lucidity_records
                  WHERE actor_id = $1",
            )
            .bind(actor_id.into_inner())
            .fetch_one(&pool)
            .await?;

            record_from_row(&row)
        })
        .await
    }

    async fn save_adjustment(
        &self,
        record: &LucidityRecord,
        entry: &AdjustmentLogEntry,
    ) -> Result<(), StoreError> {
        let pool = self.pg.pool().clone();
        let conflicted_actor = record.actor_id;
        let record = record.clone();
        let entry = entry.clone();
        let saved = self
            .bounded("save_adjustment", async move {
                let liabilities = serde_json::to_string(&record.liabilities)?;
                let metadata = serde_json::to_string(&entry.metadata)?;
                let version = i64::try_from(record.version).unwrap_or(i64::MAX);

                let mut tx = pool.begin().await?;

                let updated = sqlx::query(
                    r"UPDATE lucidity_records
                      SET score = $2, tier = $3, liabilities = $4::jsonb,
                          catatonia_entered_at = $5, version = version + 1
                      WHERE actor_id = $1 AND version = $6",
                )
                .bind(record.actor_id.into_inner())
                .bind(record.score)
                .bind(tier_to_db(record.tier))
                .bind(&liabilities)
                .bind(record.catatonia_entered_at)
                .bind(version)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    // Stale version: dropping the transaction rolls back.
                    return Ok(false);
                }

                sqlx::query(
                    r"INSERT INTO lucidity_adjustments
                          (id, actor_id, delta, reason, source, metadata, location_id, created_at)
                      VALUES ($1, $2, $3, $4, $5, $6::jsonb, $7, $8)",
                )
                .bind(entry.id.into_inner())
                .bind(entry.actor_id.into_inner())
                .bind(entry.delta)
                .bind(&entry.reason)
                .bind(source_to_db(entry.source))
                .bind(&metadata)
                .bind(entry.location_id.map(murkveil_types::LocationId::into_inner))
                .bind(entry.created_at)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(true)
            })
            .await?;

        if saved {
            Ok(())
        } else {
            Err(StoreError::Conflict {
                actor_id: conflicted_actor,
            })
        }
    }

    async fn get_exposure(
        &self,
        actor_id: ActorId,
        archetype: &str,
    ) -> Result<Option<ExposureState>, StoreError> {
        let pool = self.pg.pool().clone();
        let archetype = archetype.to_owned();
        self.bounded("get_exposure", async move {
            let row = sqlx::query(
                r"SELECT encounter_count, last_encounter_at
                  FROM lucidity_exposure
                  WHERE actor_id = $1 AND archetype = $2",
            )
            .bind(actor_id.into_inner())
            .bind(&archetype)
            .fetch_optional(&pool)
            .await?;

            row.map(|row| {
                let count: i64 = row.try_get("encounter_count")?;
                let last_encounter_at: DateTime<Utc> = row.try_get("last_encounter_at")?;
                Ok(ExposureState {
                    encounter_count: u32::try_from(count).unwrap_or(u32::MAX),
                    last_encounter_at,
                })
            })
            .transpose()
        })
        .await
    }

    async fn increment_exposure(
        &self,
        actor_id: ActorId,
        archetype: &str,
        at: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let pool = self.pg.pool().clone();
        let archetype = archetype.to_owned();
        self.bounded("increment_exposure", async move {
            let row = sqlx::query(
                r"INSERT INTO lucidity_exposure (actor_id, archetype, encounter_count, last_encounter_at)
                  VALUES ($1, $2, 1, $3)
                  ON CONFLICT (actor_id, archetype)
                  DO UPDATE SET encounter_count = lucidity_exposure.encounter_count + 1,
                                last_encounter_at = $3
                  RETURNING encounter_count",
            )
            .bind(actor_id.into_inner())
            .bind(&archetype)
            .bind(at)
            .fetch_one(&pool)
            .await?;

            let count: i64 = row.try_get("encounter_count")?;
            Ok(u32::try_from(count).unwrap_or(u32::MAX))
        })
        .await
    }

    async fn get_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let hot = self.hot.clone();
        let action = action.to_owned();
        self.bounded("get_cooldown", async move {
            hot.get_cooldown(actor_id.into_inner(), &action).await
        })
        .await
    }

    async fn set_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let hot = self.hot.clone();
        let action = action.to_owned();
        self.bounded("set_cooldown", async move {
            hot.set_cooldown(actor_id.into_inner(), &action, expires_at, Utc::now())
                .await
        })
        .await
    }

    async fn list_active_actors(
        &self,
        active_since: DateTime<Utc>,
        created_since: DateTime<Utc>,
    ) -> Result<Vec<ActorId>, StoreError> {
        let pool = self.pg.pool().clone();
        self.bounded("list_active_actors", async move {
            let rows = sqlx::query(
                r"SELECT actor_id FROM actor_activity
                  WHERE last_active_at >= $1 OR created_at >= $2
                  ORDER BY actor_id",
            )
            .bind(active_since)
            .bind(created_since)
            .fetch_all(&pool)
            .await?;

            rows.iter()
                .map(|row| {
                    let actor_id: Uuid = row.try_get("actor_id")?;
                    Ok(ActorId::from(actor_id))
                })
                .collect()
        })
        .await
    }
}

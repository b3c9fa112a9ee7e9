//! Core record structs owned by the ledger store.
//!
//! These are the durable shapes the storage layer persists and the
//! adjustment engine mutates. All mutation flows through the engine; the
//! store itself is CRUD only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::enums::{AdjustmentSource, LucidityTier};
use crate::ids::{ActorId, AdjustmentId, LocationId};

/// Starting score for a freshly created actor record.
pub const STARTING_SCORE: i32 = 100;

/// Lower clamp bound for the lucidity score.
pub const SCORE_MIN: i32 = -100;

/// Upper clamp bound for the lucidity score.
pub const SCORE_MAX: i32 = 100;

// ---------------------------------------------------------------------------
// Liabilities
// ---------------------------------------------------------------------------

/// A stackable negative status attached to an actor as a consequence of
/// severe or worsening loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Liability {
    /// Catalog code, e.g. `"paranoia"` or `"night_terrors"`.
    pub code: String,
    /// Stack count, always >= 1.
    pub stacks: u32,
}

// ---------------------------------------------------------------------------
// Lucidity record
// ---------------------------------------------------------------------------

/// Durable per-actor lucidity state.
///
/// Invariants, upheld by the adjustment engine on every write:
/// - `score` is in `[SCORE_MIN, SCORE_MAX]`
/// - `tier` equals the tier resolved from `score`
/// - `catatonia_entered_at` is set iff `tier == Terminal`
///
/// `version` is the optimistic-concurrency token: the store commits a save
/// only when the caller's version matches the stored one, then bumps it.
/// Two concurrent read-modify-write cycles for the same actor therefore
/// cannot silently interleave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LucidityRecord {
    /// The actor this record belongs to.
    pub actor_id: ActorId,
    /// Bounded stability score.
    pub score: i32,
    /// Tier derived from `score`.
    pub tier: LucidityTier,
    /// Accumulated liabilities, in acquisition order.
    pub liabilities: Vec<Liability>,
    /// When the actor entered the terminal tier, if currently in it.
    pub catatonia_entered_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency token, bumped by the store on each save.
    pub version: u64,
}

impl LucidityRecord {
    /// A fresh record for a newly seen actor: full score, stable tier.
    pub const fn fresh(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            score: STARTING_SCORE,
            tier: LucidityTier::Stable,
            liabilities: Vec::new(),
            catatonia_entered_at: None,
            version: 0,
        }
    }

    /// Whether the actor already carries the given liability code.
    pub fn has_liability(&self, code: &str) -> bool {
        self.liabilities.iter().any(|l| l.code == code)
    }
}

// ---------------------------------------------------------------------------
// Adjustment log
// ---------------------------------------------------------------------------

/// One immutable row in the append-only adjustment log.
///
/// Written atomically with the record save for every applied adjustment.
/// Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AdjustmentLogEntry {
    /// Entry identifier.
    pub id: AdjustmentId,
    /// The actor whose score was adjusted.
    pub actor_id: ActorId,
    /// The requested delta (before clamping).
    pub delta: i32,
    /// Reason code, e.g. `"passive_flux"` or `"encounter_horrific"`.
    pub reason: String,
    /// Originating subsystem.
    pub source: AdjustmentSource,
    /// Free-form factor breakdown (flux components, profile names, ...).
    pub metadata: Value,
    /// Where the adjustment happened, when known.
    pub location_id: Option<LocationId>,
    /// Real-world timestamp of the adjustment.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Exposure state
// ---------------------------------------------------------------------------

/// Per (actor, archetype) encounter history.
///
/// The counter is monotonically increasing and never decays; acclimation is
/// derived from it by the effects gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExposureState {
    /// Number of recorded encounters with this archetype.
    pub encounter_count: u32,
    /// Timestamp of the most recent encounter.
    pub last_encounter_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_starts_stable_at_full_score() {
        let record = LucidityRecord::fresh(ActorId::new());
        assert_eq!(record.score, STARTING_SCORE);
        assert_eq!(record.tier, LucidityTier::Stable);
        assert!(record.liabilities.is_empty());
        assert!(record.catatonia_entered_at.is_none());
        assert_eq!(record.version, 0);
    }

    #[test]
    fn has_liability_matches_by_code() {
        let mut record = LucidityRecord::fresh(ActorId::new());
        record.liabilities.push(Liability {
            code: String::from("paranoia"),
            stacks: 2,
        });
        assert!(record.has_liability("paranoia"));
        assert!(!record.has_liability("tremors"));
    }

    #[test]
    fn record_roundtrip_serde() {
        let record = LucidityRecord::fresh(ActorId::new());
        let json = serde_json::to_string(&record).ok();
        assert!(json.is_some());
        let restored: Result<LucidityRecord, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok().as_ref(), Some(&record));
    }
}

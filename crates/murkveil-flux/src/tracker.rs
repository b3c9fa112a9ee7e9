//! Scheduler-private per-actor flux state.
//!
//! One [`FluxTracker`] per eligible actor: the fractional residual, the
//! room the actor was last seen in, and how many consecutive cadences they
//! have stayed there (feeding adaptive resistance). Only the scheduler
//! task touches this table, so no locking is needed; trackers for actors
//! that fall out of eligibility are pruned each cadence.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use murkveil_types::{ActorId, LocationId};

/// Per-actor flux state carried between cadences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxTracker {
    /// Fractional accumulator (see [`crate::residual`]).
    pub residual: Decimal,
    /// Room the actor occupied last cadence.
    pub location_id: LocationId,
    /// Consecutive cadences spent in `location_id`, this one included.
    pub cadences_in_location: u32,
}

/// The scheduler's tracker table.
#[derive(Debug, Default)]
pub struct TrackerTable {
    trackers: BTreeMap<ActorId, FluxTracker>,
}

impl TrackerTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            trackers: BTreeMap::new(),
        }
    }

    /// Record the actor's location for this cadence and return their
    /// tracker. Staying in the same room advances the consecutive-cadence
    /// counter; moving resets it to 1. The residual persists across moves.
    pub fn observe(&mut self, actor_id: ActorId, location_id: LocationId) -> &mut FluxTracker {
        let tracker = self.trackers.entry(actor_id).or_insert(FluxTracker {
            residual: Decimal::ZERO,
            location_id,
            cadences_in_location: 0,
        });
        if tracker.location_id == location_id {
            tracker.cadences_in_location = tracker.cadences_in_location.saturating_add(1);
        } else {
            tracker.location_id = location_id;
            tracker.cadences_in_location = 1;
        }
        tracker
    }

    /// Drop trackers for actors not in `keep`. Returns how many were
    /// removed.
    pub fn prune(&mut self, keep: &BTreeSet<ActorId>) -> usize {
        let before = self.trackers.len();
        self.trackers.retain(|actor_id, _| keep.contains(actor_id));
        before.saturating_sub(self.trackers.len())
    }

    /// Look up an actor's tracker.
    pub fn get(&self, actor_id: ActorId) -> Option<&FluxTracker> {
        self.trackers.get(&actor_id)
    }

    /// Number of tracked actors.
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Adaptive resistance
// ---------------------------------------------------------------------------

/// Magnitude reduction (percent) earned by staying put.
///
/// Negative flux only; the caller gates on sign. After one full resistance
/// window of consecutive cadences in the same room the reduction is 25%,
/// after two full windows 50% -- the maximum, never beyond it.
pub const fn resistance_reduction_pct(cadences_in_location: u32, window: u32) -> u32 {
    if window == 0 {
        return 0;
    }
    if cadences_in_location > window.saturating_mul(2) {
        50
    } else if cadences_in_location > window {
        25
    } else {
        0
    }
}

/// Scale a flux value down by a percentage reduction.
pub fn apply_resistance(flux: Decimal, reduction_pct: u32) -> Decimal {
    if reduction_pct == 0 {
        return flux;
    }
    let keep = Decimal::from(100_u32.saturating_sub(reduction_pct));
    flux.saturating_mul(keep)
        .checked_div(Decimal::ONE_HUNDRED)
        .unwrap_or(flux)
}

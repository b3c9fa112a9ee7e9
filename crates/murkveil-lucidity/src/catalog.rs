//! Static profile catalogs for triggered effects and liabilities.
//!
//! Catalogs are loaded once at startup (defaults below, or deserialized
//! from the `catalogs` section of `murkveil-config.yaml`) and never
//! hot-reloaded mid-process. The effects gateway looks up encounter
//! categories and recovery action codes here; the adjustment engine draws
//! liability codes from the liability catalog.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use rand::Rng;
use rand::seq::IndexedRandom;

use murkveil_types::LucidityRecord;

// ---------------------------------------------------------------------------
// Encounter profiles
// ---------------------------------------------------------------------------

/// Lucidity deltas for one encounter category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncounterProfile {
    /// Delta applied on the actor's first exposure to an archetype.
    pub first_time: i32,
    /// Delta applied on subsequent exposures (halved once acclimated).
    pub repeat: i32,
}

/// Catalog of encounter categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterCatalog {
    profiles: BTreeMap<String, EncounterProfile>,
}

impl EncounterCatalog {
    /// Build a catalog from explicit entries.
    pub const fn new(profiles: BTreeMap<String, EncounterProfile>) -> Self {
        Self { profiles }
    }

    /// Look up the profile for a category code.
    pub fn get(&self, category: &str) -> Option<EncounterProfile> {
        self.profiles.get(category).copied()
    }
}

impl Default for EncounterCatalog {
    /// The stock category table.
    ///
    /// | Category   | First time | Repeat |
    /// |------------|------------|--------|
    /// | unsettling | -5         | -2     |
    /// | harrowing  | -12        | -5     |
    /// | horrific   | -30        | -12    |
    /// | abyssal    | -50        | -25    |
    fn default() -> Self {
        Self::new(BTreeMap::from([
            (
                String::from("unsettling"),
                EncounterProfile { first_time: -5, repeat: -2 },
            ),
            (
                String::from("harrowing"),
                EncounterProfile { first_time: -12, repeat: -5 },
            ),
            (
                String::from("horrific"),
                EncounterProfile { first_time: -30, repeat: -12 },
            ),
            (
                String::from("abyssal"),
                EncounterProfile { first_time: -50, repeat: -25 },
            ),
        ]))
    }
}

// ---------------------------------------------------------------------------
// Recovery profiles
// ---------------------------------------------------------------------------

/// Delta and rate limit for one recovery ritual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryProfile {
    /// Delta applied on a successful performance.
    pub delta: i32,
    /// Cooldown armed after each successful performance.
    pub cooldown: TimeDelta,
}

/// Catalog of recovery action codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryCatalog {
    profiles: BTreeMap<String, RecoveryProfile>,
}

impl RecoveryCatalog {
    /// Build a catalog from explicit entries.
    pub const fn new(profiles: BTreeMap<String, RecoveryProfile>) -> Self {
        Self { profiles }
    }

    /// Look up the profile for an action code.
    pub fn get(&self, action: &str) -> Option<RecoveryProfile> {
        self.profiles.get(action).copied()
    }
}

impl Default for RecoveryCatalog {
    /// The stock ritual table.
    ///
    /// | Action        | Delta | Cooldown |
    /// |---------------|-------|----------|
    /// | steady_breath | +3    | 10 min   |
    /// | commune       | +8    | 1 h      |
    /// | votive_rite   | +15   | 6 h      |
    /// | deep_sleep    | +25   | 20 h     |
    fn default() -> Self {
        Self::new(BTreeMap::from([
            (
                String::from("steady_breath"),
                RecoveryProfile { delta: 3, cooldown: TimeDelta::minutes(10) },
            ),
            (
                String::from("commune"),
                RecoveryProfile { delta: 8, cooldown: TimeDelta::hours(1) },
            ),
            (
                String::from("votive_rite"),
                RecoveryProfile { delta: 15, cooldown: TimeDelta::hours(6) },
            ),
            (
                String::from("deep_sleep"),
                RecoveryProfile { delta: 25, cooldown: TimeDelta::hours(20) },
            ),
        ]))
    }
}

// ---------------------------------------------------------------------------
// Liability catalog
// ---------------------------------------------------------------------------

/// Ordered catalog of liability codes the engine can roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiabilityCatalog {
    codes: Vec<String>,
}

impl LiabilityCatalog {
    /// Build a catalog from explicit codes. An empty catalog disables
    /// liability rolls entirely.
    pub const fn new(codes: Vec<String>) -> Self {
        Self { codes }
    }

    /// Whether the catalog has no codes.
    pub const fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Pick a code for the given actor: uniformly random among codes the
    /// actor does not already carry, falling back to the first catalog
    /// entry when every code is already stacked.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        record: &LucidityRecord,
        rng: &mut R,
    ) -> Option<&str> {
        let candidates: Vec<&String> = self
            .codes
            .iter()
            .filter(|code| !record.has_liability(code))
            .collect();

        candidates
            .choose(rng)
            .map(|code| code.as_str())
            .or_else(|| self.codes.first().map(String::as_str))
    }
}

impl Default for LiabilityCatalog {
    fn default() -> Self {
        Self::new(vec![
            String::from("paranoia"),
            String::from("night_terrors"),
            String::from("tremors"),
            String::from("whispers"),
            String::from("phantom_stench"),
        ])
    }
}

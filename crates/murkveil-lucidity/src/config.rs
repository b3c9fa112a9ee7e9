//! Configuration defaults for the lucidity core.
//!
//! The [`LucidityConfig`] struct bundles every tunable of the adjustment
//! engine and the effects gateway so that callers (engine wiring, tests)
//! can override defaults. Values mirror the `lucidity` section of
//! `murkveil-config.yaml`.

use serde::Deserialize;

/// Tunables for the adjustment engine and effects gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LucidityConfig {
    /// Minimum magnitude of a negative delta that rolls a liability even
    /// when the tier did not worsen (default: 15).
    pub loss_threshold: u32,

    /// Encounter count at which the repeat penalty halves (default: 6).
    pub acclimation_threshold: u32,

    /// Score at or below which the acute-crisis ("delirium") event fires
    /// on a downward crossing (default: -10). Independent of the terminal
    /// tier boundary and of the absolute floor.
    pub crisis_threshold: i32,

    /// Maximum score used when capping the value carried on state-change
    /// events (default: 100).
    pub score_cap: i32,

    /// How many times the engine re-reads and retries an apply when the
    /// store reports a version conflict (default: 3).
    pub conflict_retries: u32,
}

impl Default for LucidityConfig {
    fn default() -> Self {
        Self {
            loss_threshold: 15,
            acclimation_threshold: 6,
            crisis_threshold: -10,
            score_cap: 100,
            conflict_retries: 3,
        }
    }
}

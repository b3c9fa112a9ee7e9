//! Enumeration types for the lucidity subsystem.
//!
//! Tiers, adjustment sources, crisis status codes, and the location/day-phase
//! vocabulary the flux scheduler resolves rates against.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Lucidity tiers
// ---------------------------------------------------------------------------

/// Discrete stability band derived from an actor's lucidity score.
///
/// Variants are ordered by increasing severity, so `Ord` comparisons answer
/// "did the tier worsen": `new_tier > previous_tier` means a downward slide.
///
/// | Tier | Score range |
/// |-----------|-------------|
/// | Stable    | 70 ..= 100  |
/// | Uneasy    | 40 ..= 69   |
/// | Fractured | 20 ..= 39   |
/// | Deranged  | 1 ..= 19    |
/// | Terminal  | -100 ..= 0  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum LucidityTier {
    /// Fully grounded. No gameplay penalties.
    Stable,
    /// Minor intrusive impressions; cosmetic effects only.
    Uneasy,
    /// Perception begins to fray; hallucination checks start here.
    Fractured,
    /// Severely impaired; counts as impaired for companion modifiers.
    Deranged,
    /// Catatonic. Tracked by the catatonia registry while occupied.
    Terminal,
}

impl LucidityTier {
    /// Whether this tier counts as impaired for co-location effects.
    pub const fn is_impaired(self) -> bool {
        matches!(self, Self::Deranged | Self::Terminal)
    }

    /// Whether actors in this tier are subject to hallucination checks.
    pub const fn hallucination_prone(self) -> bool {
        matches!(self, Self::Fractured | Self::Deranged | Self::Terminal)
    }
}

// ---------------------------------------------------------------------------
// Adjustment provenance
// ---------------------------------------------------------------------------

/// The subsystem that originated a lucidity adjustment.
///
/// Carried on every adjustment-log entry and state-change event so client
/// messaging and analytics can distinguish drift from discrete effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentSource {
    /// Environmental/social drift applied by the flux scheduler.
    PassiveFlux,
    /// Loss from a hostile-encounter effect.
    Encounter,
    /// Gain from a recovery ritual.
    Recovery,
    /// Administrative or scripted adjustment.
    System,
}

// ---------------------------------------------------------------------------
// Crisis status codes
// ---------------------------------------------------------------------------

/// Distinguishing status carried on crisis events pushed to the transport.
///
/// The three downward thresholds (terminal boundary, acute crisis, absolute
/// floor) are independent and may all fire from a single adjustment; each
/// produces its own event with its own status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum CrisisStatus {
    /// The actor entered the terminal tier.
    Catatonia,
    /// The actor left the terminal tier.
    CatatoniaLifted,
    /// The actor crossed the acute-crisis threshold (score <= -10).
    Delirium,
    /// The actor hit the absolute floor (score <= -100).
    Floor,
}

// ---------------------------------------------------------------------------
// World vocabulary for flux resolution
// ---------------------------------------------------------------------------

/// Broad category of a location, used as the default rung of the flux-rate
/// override hierarchy when no location/region override applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// Consecrated or warded ground; restores lucidity.
    Sanctuary,
    /// Inhabited settlements; mild restoration by day.
    Settlement,
    /// Open wilderness; mild drain.
    Wilds,
    /// Abandoned or desecrated structures; steady drain.
    Ruin,
    /// The deep places; severe drain day and night.
    Depths,
}

/// Day/night phase used to pick the location-type flux variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum DayPhase {
    /// Daylight hours.
    Day,
    /// Night hours; drains worsen, restoration weakens.
    Night,
}

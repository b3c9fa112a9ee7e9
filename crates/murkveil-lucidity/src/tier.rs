//! Score-to-tier resolution.
//!
//! A pure, total mapping over the full clamp range (and any `i32` beyond
//! it). Every write path resolves the tier through this function so the
//! `tier == resolve_tier(score)` record invariant holds by construction.

use murkveil_types::LucidityTier;

/// Minimum score for the `Stable` tier.
pub const STABLE_FLOOR: i32 = 70;

/// Minimum score for the `Uneasy` tier.
pub const UNEASY_FLOOR: i32 = 40;

/// Minimum score for the `Fractured` tier.
pub const FRACTURED_FLOOR: i32 = 20;

/// Minimum score for the `Deranged` tier; anything below is `Terminal`.
pub const DERANGED_FLOOR: i32 = 1;

/// Resolve the tier for a given score.
pub const fn resolve_tier(score: i32) -> LucidityTier {
    if score >= STABLE_FLOOR {
        LucidityTier::Stable
    } else if score >= UNEASY_FLOOR {
        LucidityTier::Uneasy
    } else if score >= FRACTURED_FLOOR {
        LucidityTier::Fractured
    } else if score >= DERANGED_FLOOR {
        LucidityTier::Deranged
    } else {
        LucidityTier::Terminal
    }
}

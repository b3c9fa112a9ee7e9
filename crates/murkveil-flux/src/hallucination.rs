//! Timer-gated hallucination checks.
//!
//! Actors at `Fractured` or worse are eligible for a hallucination check
//! once per cooldown window. The check itself is what the timer gates: the
//! cooldown re-arms after every check, hit or miss, through the same
//! cooldown storage the recovery rituals use. A successful roll emits a
//! transport event only -- the score is untouched.

use chrono::TimeDelta;
use rand::Rng;

use murkveil_types::LucidityTier;

/// Cooldown slot name for hallucination checks in the ledger store.
pub const HALLUCINATION_SLOT: &str = "hallucination_check";

/// Tunables for hallucination checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HallucinationConfig {
    /// Minimum time between checks for one actor.
    pub cooldown: TimeDelta,
    /// Roll chance (percent) at the `Fractured` tier.
    pub fractured_pct: u32,
    /// Roll chance (percent) at the `Deranged` tier.
    pub deranged_pct: u32,
    /// Roll chance (percent) at the `Terminal` tier.
    pub terminal_pct: u32,
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self {
            cooldown: TimeDelta::minutes(8),
            fractured_pct: 15,
            deranged_pct: 30,
            terminal_pct: 45,
        }
    }
}

impl HallucinationConfig {
    /// Roll chance for a tier; zero for tiers that are not prone.
    pub const fn chance_for(&self, tier: LucidityTier) -> u32 {
        match tier {
            LucidityTier::Stable | LucidityTier::Uneasy => 0,
            LucidityTier::Fractured => self.fractured_pct,
            LucidityTier::Deranged => self.deranged_pct,
            LucidityTier::Terminal => self.terminal_pct,
        }
    }
}

/// Roll a percentage chance.
pub fn roll<R: Rng + ?Sized>(chance_pct: u32, rng: &mut R) -> bool {
    if chance_pct == 0 {
        return false;
    }
    if chance_pct >= 100 {
        return true;
    }
    rng.random_range(0_u32..100) < chance_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chance_scales_with_tier() {
        let config = HallucinationConfig::default();
        assert_eq!(config.chance_for(LucidityTier::Stable), 0);
        assert_eq!(config.chance_for(LucidityTier::Uneasy), 0);
        assert_eq!(config.chance_for(LucidityTier::Fractured), 15);
        assert_eq!(config.chance_for(LucidityTier::Deranged), 30);
        assert_eq!(config.chance_for(LucidityTier::Terminal), 45);
    }

    #[test]
    fn degenerate_chances_short_circuit() {
        let mut rng = rand::rng();
        assert!(!roll(0, &mut rng));
        assert!(roll(100, &mut rng));
        assert!(roll(150, &mut rng));
    }

    #[test]
    fn mid_chance_hits_sometimes() {
        let mut rng = rand::rng();
        let hits = (0..1000).filter(|_| roll(50, &mut rng)).count();
        // With p = 0.5 over 1000 rolls, staying outside 350..650 is
        // vanishingly unlikely.
        assert!((350..650).contains(&hits), "hits = {hits}");
    }
}

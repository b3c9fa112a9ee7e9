//! Configuration for the flux scheduler.
//!
//! The scheduler rides the engine's global pulse: it is ticked every
//! `tick_interval`, counts ticks, and fires one cadence every
//! `ticks_per_cadence` ticks -- once per in-world minute at the defaults.

use std::time::Duration;

use chrono::TimeDelta;
use rust_decimal::Decimal;

use crate::hallucination::HallucinationConfig;

/// Tunables for the flux scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxConfig {
    /// Engine pulse interval driving [`FluxScheduler::run`].
    ///
    /// [`FluxScheduler::run`]: crate::scheduler::FluxScheduler::run
    pub tick_interval: Duration,

    /// Pulse ticks per cadence firing (default: 6, one in-world minute at
    /// a 10-second pulse).
    pub ticks_per_cadence: u32,

    /// Actors active within this window are eligible (default: 5 minutes).
    pub activity_window: TimeDelta,

    /// Actors created within this window are eligible even without
    /// recorded activity (default: 1 hour).
    pub newcomer_window: TimeDelta,

    /// Bonus per co-located non-impaired actor (default: +0.1).
    pub companion_bonus: Decimal,

    /// Cap on the summed companion bonus (default: +0.3).
    pub companion_bonus_cap: Decimal,

    /// Penalty when any co-located actor is impaired (default: 0.2,
    /// applied as a subtraction). Not mutually exclusive with the bonus.
    pub impaired_penalty: Decimal,

    /// Cadences in the same room that make up one resistance window
    /// (default: 15).
    pub resistance_window: u32,

    /// Hour of day (UTC) when the day phase begins (default: 6).
    pub day_start_hour: u32,

    /// Hour of day (UTC) when the night phase begins (default: 18).
    pub night_start_hour: u32,

    /// Hallucination check tunables.
    pub hallucination: HallucinationConfig,
}

impl Default for FluxConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(10),
            ticks_per_cadence: 6,
            activity_window: TimeDelta::minutes(5),
            newcomer_window: TimeDelta::hours(1),
            companion_bonus: Decimal::new(1, 1),
            companion_bonus_cap: Decimal::new(3, 1),
            impaired_penalty: Decimal::new(2, 1),
            resistance_window: 15,
            day_start_hour: 6,
            night_start_hour: 18,
            hallucination: HallucinationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FluxConfig::default();
        assert_eq!(cfg.tick_interval, Duration::from_secs(10));
        assert_eq!(cfg.ticks_per_cadence, 6);
        assert_eq!(cfg.activity_window, TimeDelta::minutes(5));
        assert_eq!(cfg.newcomer_window, TimeDelta::hours(1));
        assert_eq!(cfg.companion_bonus, Decimal::new(1, 1));
        assert_eq!(cfg.companion_bonus_cap, Decimal::new(3, 1));
        assert_eq!(cfg.impaired_penalty, Decimal::new(2, 1));
        assert_eq!(cfg.resistance_window, 15);
    }
}

//! The flux scheduler: passive drift applied once per cadence.
//!
//! The scheduler rides the engine's global pulse. Each firing it scans the
//! eligible actors (active within the activity window, or created within
//! the newcomer window), resolves a base rate through the override
//! hierarchy, folds in companion modifiers and adaptive resistance, runs
//! the fractional-residual accumulator, and hands any whole-unit delta to
//! the adjustment engine with reason `passive_flux`. Trackers for actors
//! that fell out of eligibility are pruned at the end of the firing.
//!
//! Firings never overlap: the loop awaits each cadence inline on its
//! interval, so a slow sweep simply delays the next pulse.
//!
//! Per-actor failures are logged and counted, not fatal to the sweep --
//! one actor's storage hiccup must not starve the rest of the world of
//! its drift.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use murkveil_lucidity::{
    AdjustmentEngine, AdjustmentRequest, LucidityError, LucidityStore, Notifier,
};
use murkveil_types::{
    ActorId, AdjustmentSource, DayPhase, HallucinationEvent, LocationId, LucidityEvent,
    LucidityTier,
};

use crate::config::FluxConfig;
use crate::error::FluxError;
use crate::hallucination::{self, HALLUCINATION_SLOT};
use crate::rate::{FluxRates, WorldOverrideMap, resolve_rate};
use crate::residual;
use crate::tracker::{TrackerTable, apply_resistance, resistance_reduction_pct};
use crate::world::WorldView;

/// What one cadence firing did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CadenceSummary {
    /// Actors selected by the eligibility scan.
    pub eligible: usize,
    /// Actors that received a non-zero delta.
    pub applied: u32,
    /// Actors whose processing failed (logged, not fatal).
    pub errors: u32,
    /// Hallucination events emitted.
    pub hallucinations: u32,
    /// Trackers dropped for no-longer-eligible actors.
    pub pruned: usize,
}

/// Per-actor result within one cadence.
#[derive(Debug, Clone, Copy, Default)]
struct ActorCadence {
    applied: bool,
    hallucinated: bool,
}

/// The flux scheduler. One instance per process; all tracker state is
/// private to the scheduler task.
pub struct FluxScheduler<S, W> {
    engine: Arc<AdjustmentEngine<S>>,
    world: Arc<W>,
    notifier: Arc<dyn Notifier>,
    rates: FluxRates,
    overrides: WorldOverrideMap,
    config: FluxConfig,
    trackers: TrackerTable,
    ticks_seen: u64,
}

impl<S: LucidityStore, W: WorldView> FluxScheduler<S, W> {
    /// Create a scheduler with the stock rate table, no world overrides,
    /// and default config.
    pub fn new(
        engine: Arc<AdjustmentEngine<S>>,
        world: Arc<W>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            world,
            notifier,
            rates: FluxRates::default(),
            overrides: WorldOverrideMap::new(),
            config: FluxConfig::default(),
            trackers: TrackerTable::new(),
            ticks_seen: 0,
        }
    }

    /// Replace the rate table.
    #[must_use]
    pub fn with_rates(mut self, rates: FluxRates) -> Self {
        self.rates = rates;
        self
    }

    /// Replace the world override map.
    #[must_use]
    pub fn with_overrides(mut self, overrides: WorldOverrideMap) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub const fn with_config(mut self, config: FluxConfig) -> Self {
        self.config = config;
        self
    }

    /// Look up an actor's tracker (tests, inspection tooling).
    pub fn tracker(&self, actor_id: ActorId) -> Option<&crate::tracker::FluxTracker> {
        self.trackers.get(actor_id)
    }

    /// Count one engine pulse tick; runs a cadence when the divisor lands.
    pub async fn on_tick(&mut self) -> Option<CadenceSummary> {
        self.ticks_seen = self.ticks_seen.saturating_add(1);
        let per = u64::from(self.config.ticks_per_cadence.max(1));
        if self.ticks_seen.checked_rem(per) == Some(0) {
            Some(self.run_cadence().await)
        } else {
            None
        }
    }

    /// Drive the scheduler on its own pulse until the task is aborted.
    ///
    /// Cadence firings are awaited inline, so they never overlap; a firing
    /// that outruns the pulse interval just delays the next tick.
    pub async fn run(mut self) {
        let mut pulse = tokio::time::interval(self.config.tick_interval);
        pulse.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            tick_interval_ms = u64::try_from(self.config.tick_interval.as_millis())
                .unwrap_or(u64::MAX),
            ticks_per_cadence = self.config.ticks_per_cadence,
            "flux scheduler running"
        );
        loop {
            pulse.tick().await;
            if let Some(summary) = self.on_tick().await {
                debug!(
                    eligible = summary.eligible,
                    applied = summary.applied,
                    errors = summary.errors,
                    hallucinations = summary.hallucinations,
                    pruned = summary.pruned,
                    "cadence complete"
                );
            }
        }
    }

    /// Run one cadence firing over all eligible actors.
    pub async fn run_cadence(&mut self) -> CadenceSummary {
        let now = Utc::now();
        let active_since = now
            .checked_sub_signed(self.config.activity_window)
            .unwrap_or(now);
        let created_since = now
            .checked_sub_signed(self.config.newcomer_window)
            .unwrap_or(now);

        let eligible = match self
            .engine
            .store()
            .list_active_actors(active_since, created_since)
            .await
        {
            Ok(actors) => actors,
            Err(error) => {
                warn!(%error, "eligibility scan failed, cadence skipped");
                return CadenceSummary {
                    errors: 1,
                    ..CadenceSummary::default()
                };
            }
        };

        let phase = phase_for_hour(
            now.hour(),
            self.config.day_start_hour,
            self.config.night_start_hour,
        );

        let mut summary = CadenceSummary {
            eligible: eligible.len(),
            ..CadenceSummary::default()
        };
        let mut tier_cache: BTreeMap<ActorId, LucidityTier> = BTreeMap::new();

        for actor_id in &eligible {
            match self.process_actor(*actor_id, phase, now, &mut tier_cache).await {
                Ok(result) => {
                    if result.applied {
                        summary.applied = summary.applied.saturating_add(1);
                    }
                    if result.hallucinated {
                        summary.hallucinations = summary.hallucinations.saturating_add(1);
                    }
                }
                Err(error) => {
                    warn!(actor_id = %actor_id, %error, "flux processing failed for actor");
                    summary.errors = summary.errors.saturating_add(1);
                }
            }
        }

        let keep: BTreeSet<ActorId> = eligible.iter().copied().collect();
        summary.pruned = self.trackers.prune(&keep);

        summary
    }

    /// Process one actor: resolve, modify, resist, settle, apply.
    async fn process_actor(
        &mut self,
        actor_id: ActorId,
        phase: DayPhase,
        now: DateTime<Utc>,
        tier_cache: &mut BTreeMap<ActorId, LucidityTier>,
    ) -> Result<ActorCadence, FluxError> {
        let Some(profile) = self.world.locate(actor_id).await? else {
            // Not placed in the world right now (logging in, limbo).
            return Ok(ActorCadence::default());
        };

        let (base, rung) = resolve_rate(&self.rates, &self.overrides, &profile, phase);

        // Companion modifiers: steady company helps, impaired company
        // frightens. The bonus cap and the impairment penalty are
        // independent of each other.
        let mut steady: u32 = 0;
        let mut impaired_present = false;
        for other in &profile.occupants {
            if *other == actor_id {
                continue;
            }
            let tier = tier_of(self.engine.store().as_ref(), tier_cache, *other).await?;
            if tier.is_impaired() {
                impaired_present = true;
            } else {
                steady = steady.saturating_add(1);
            }
        }
        let bonus = self
            .config
            .companion_bonus
            .saturating_mul(Decimal::from(steady))
            .min(self.config.companion_bonus_cap);
        let mut flux = base.saturating_add(bonus);
        if impaired_present {
            flux = flux.saturating_sub(self.config.impaired_penalty);
        }

        // Adaptive resistance (negative flux only), then the residual
        // accumulator decides whether a whole unit moves this cadence.
        let (delta, reduction_pct, residual_after) = {
            let tracker = self.trackers.observe(actor_id, profile.location_id);
            let reduction_pct = if flux.is_sign_negative() && !flux.is_zero() {
                resistance_reduction_pct(
                    tracker.cadences_in_location,
                    self.config.resistance_window,
                )
            } else {
                0
            };
            let adjusted = apply_resistance(flux, reduction_pct);
            let delta = residual::settle(&mut tracker.residual, adjusted);
            (delta, reduction_pct, tracker.residual)
        };

        let mut current_tier = tier_of(self.engine.store().as_ref(), tier_cache, actor_id).await?;
        let mut applied = false;
        if delta != 0 {
            let request = AdjustmentRequest::new(
                actor_id,
                delta,
                "passive_flux",
                AdjustmentSource::PassiveFlux,
            )
            .with_metadata(json!({
                "base": base,
                "rung": rung.as_str(),
                "phase": phase_str(phase),
                "companion_bonus": bonus,
                "impaired_present": impaired_present,
                "resistance_pct": reduction_pct,
                "residual": residual_after,
            }))
            .with_location(profile.location_id);

            let outcome = self.engine.apply(request).await.map_err(FluxError::from)?;
            current_tier = outcome.new_tier;
            tier_cache.insert(actor_id, current_tier);
            applied = true;
        }

        let hallucinated = if current_tier.hallucination_prone() {
            self.check_hallucination(actor_id, profile.location_id, current_tier, now)
                .await?
        } else {
            false
        };

        Ok(ActorCadence {
            applied,
            hallucinated,
        })
    }

    /// Run a timer-gated hallucination check for an impaired actor.
    ///
    /// The cooldown gates the check itself and re-arms after every check,
    /// hit or miss.
    async fn check_hallucination(
        &self,
        actor_id: ActorId,
        location_id: LocationId,
        tier: LucidityTier,
        now: DateTime<Utc>,
    ) -> Result<bool, FluxError> {
        let store = self.engine.store();
        if let Some(expiry) = store
            .get_cooldown(actor_id, HALLUCINATION_SLOT)
            .await
            .map_err(LucidityError::from)?
            && expiry > now
        {
            return Ok(false);
        }

        let expires_at = now
            .checked_add_signed(self.config.hallucination.cooldown)
            .unwrap_or(now);
        store
            .set_cooldown(actor_id, HALLUCINATION_SLOT, expires_at)
            .await
            .map_err(LucidityError::from)?;

        let chance = self.config.hallucination.chance_for(tier);
        let hit = {
            let mut rng = rand::rng();
            hallucination::roll(chance, &mut rng)
        };
        if hit {
            debug!(%actor_id, ?tier, "hallucination check triggered");
            self.notifier
                .notify(LucidityEvent::Hallucination(HallucinationEvent {
                    actor_id,
                    location_id: Some(location_id),
                    tier,
                }));
        }
        Ok(hit)
    }
}

/// Tier lookup with a per-cadence cache so co-located actors are read once.
async fn tier_of<S: LucidityStore>(
    store: &S,
    cache: &mut BTreeMap<ActorId, LucidityTier>,
    actor_id: ActorId,
) -> Result<LucidityTier, FluxError> {
    if let Some(tier) = cache.get(&actor_id) {
        return Ok(*tier);
    }
    let record = store
        .get_or_create(actor_id)
        .await
        .map_err(LucidityError::from)?;
    cache.insert(actor_id, record.tier);
    Ok(record.tier)
}

/// Map an hour of day onto the day/night phase.
const fn phase_for_hour(hour: u32, day_start: u32, night_start: u32) -> DayPhase {
    if hour >= day_start && hour < night_start {
        DayPhase::Day
    } else {
        DayPhase::Night
    }
}

/// Stable string form of a phase for metadata.
const fn phase_str(phase: DayPhase) -> &'static str {
    match phase {
        DayPhase::Day => "day",
        DayPhase::Night => "night",
    }
}

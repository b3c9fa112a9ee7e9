//! The active effects gateway: validated, cooldown-gated triggered effects.
//!
//! Two effect families, both delegating the actual score mutation to the
//! adjustment engine:
//!
//! - **Encounter loss** — hostile-encounter penalties shaped by the actor's
//!   exposure history with the archetype (acclimation).
//! - **Recovery rituals** — rate-limited gains gated by per-(actor, action)
//!   cooldowns.
//!
//! Validation failures (unknown codes, live cooldowns) reject the call
//! before anything is written.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde_json::json;
use tracing::debug;

use murkveil_types::{ActorId, AdjustmentSource, LocationId};

use crate::catalog::{EncounterCatalog, RecoveryCatalog};
use crate::config::LucidityConfig;
use crate::engine::{AdjustmentEngine, AdjustmentOutcome, AdjustmentRequest};
use crate::error::LucidityError;
use crate::store::LucidityStore;

/// Result of an applied encounter effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterOutcome {
    /// The underlying score adjustment.
    pub adjustment: AdjustmentOutcome,
    /// The actor's exposure count for this archetype, after this encounter.
    pub encounter_count: u32,
    /// Whether the acclimation discount applied to the penalty.
    pub acclimated: bool,
}

/// Gateway for triggered effects.
pub struct EffectsGateway<S> {
    engine: Arc<AdjustmentEngine<S>>,
    store: Arc<S>,
    encounters: EncounterCatalog,
    recoveries: RecoveryCatalog,
    config: LucidityConfig,
}

impl<S: LucidityStore> EffectsGateway<S> {
    /// Create a gateway with the default catalogs and config.
    pub fn new(engine: Arc<AdjustmentEngine<S>>, store: Arc<S>) -> Self {
        Self {
            engine,
            store,
            encounters: EncounterCatalog::default(),
            recoveries: RecoveryCatalog::default(),
            config: LucidityConfig::default(),
        }
    }

    /// Replace the encounter catalog.
    #[must_use]
    pub fn with_encounter_catalog(mut self, encounters: EncounterCatalog) -> Self {
        self.encounters = encounters;
        self
    }

    /// Replace the recovery catalog.
    #[must_use]
    pub fn with_recovery_catalog(mut self, recoveries: RecoveryCatalog) -> Self {
        self.recoveries = recoveries;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub const fn with_config(mut self, config: LucidityConfig) -> Self {
        self.config = config;
        self
    }

    /// Apply the lucidity loss from a hostile encounter.
    ///
    /// The first exposure to an archetype applies the category's
    /// `first_time` delta. Once the exposure count reaches the acclimation
    /// threshold, the `repeat` delta is halved toward zero -- but a negative
    /// penalty whose half truncates to zero floors at -1, so acclimation
    /// never fully eliminates it. In between, `repeat` applies unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`LucidityError::UnknownEncounterCategory`] for a category
    /// absent from the catalog (the caller may retry with a fallback), or
    /// [`LucidityError::Storage`] on store failure.
    pub async fn apply_encounter(
        &self,
        actor_id: ActorId,
        archetype: &str,
        category: &str,
        location_id: Option<LocationId>,
    ) -> Result<EncounterOutcome, LucidityError> {
        let profile = self.encounters.get(category).ok_or_else(|| {
            LucidityError::UnknownEncounterCategory {
                category: category.to_owned(),
            }
        })?;

        let count = self
            .store
            .increment_exposure(actor_id, archetype, Utc::now())
            .await?;

        let acclimated = count >= self.config.acclimation_threshold;
        let delta = if count <= 1 {
            profile.first_time
        } else if acclimated {
            halve_toward_zero_floored(profile.repeat)
        } else {
            profile.repeat
        };

        debug!(
            %actor_id,
            archetype,
            category,
            encounter_count = count,
            acclimated,
            delta,
            "encounter effect resolved"
        );

        let mut request = AdjustmentRequest::new(
            actor_id,
            delta,
            format!("encounter_{category}"),
            AdjustmentSource::Encounter,
        )
        .with_metadata(json!({
            "archetype": archetype,
            "category": category,
            "encounter_count": count,
            "acclimated": acclimated,
        }));
        if let Some(location_id) = location_id {
            request = request.with_location(location_id);
        }

        let adjustment = self.engine.apply(request).await?;
        Ok(EncounterOutcome {
            adjustment,
            encounter_count: count,
            acclimated,
        })
    }

    /// Perform a recovery ritual.
    ///
    /// # Errors
    ///
    /// Returns [`LucidityError::UnknownActionCode`] for a code absent from
    /// the catalog, [`LucidityError::OnCooldown`] (carrying the remaining
    /// time) while the previous performance's cooldown is live, or
    /// [`LucidityError::Storage`] on store failure.
    pub async fn perform_recovery(
        &self,
        actor_id: ActorId,
        action: &str,
        location_id: Option<LocationId>,
    ) -> Result<AdjustmentOutcome, LucidityError> {
        let profile = self.recoveries.get(action).ok_or_else(|| {
            LucidityError::UnknownActionCode {
                code: action.to_owned(),
            }
        })?;

        let now = Utc::now();
        if let Some(remaining) = self.remaining_cooldown_at(actor_id, action, now).await? {
            return Err(LucidityError::OnCooldown {
                action: action.to_owned(),
                remaining,
            });
        }

        let mut request = AdjustmentRequest::new(
            actor_id,
            profile.delta,
            action.to_owned(),
            AdjustmentSource::Recovery,
        )
        .with_metadata(json!({
            "action": action,
            "cooldown_seconds": profile.cooldown.num_seconds(),
        }));
        if let Some(location_id) = location_id {
            request = request.with_location(location_id);
        }

        let outcome = self.engine.apply(request).await?;

        let expires_at = now.checked_add_signed(profile.cooldown).unwrap_or(now);
        self.store.set_cooldown(actor_id, action, expires_at).await?;
        debug!(
            %actor_id,
            action,
            expires_at = %expires_at,
            "recovery performed, cooldown armed"
        );

        Ok(outcome)
    }

    /// Time left on the actor's cooldown for an action, if any.
    ///
    /// `None` means the action is ready.
    pub async fn remaining_cooldown(
        &self,
        actor_id: ActorId,
        action: &str,
    ) -> Result<Option<TimeDelta>, LucidityError> {
        self.remaining_cooldown_at(actor_id, action, Utc::now()).await
    }

    async fn remaining_cooldown_at(
        &self,
        actor_id: ActorId,
        action: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<TimeDelta>, LucidityError> {
        let expiry = self.store.get_cooldown(actor_id, action).await?;
        Ok(expiry
            .filter(|at| *at > now)
            .map(|at| at.signed_duration_since(now)))
    }
}

/// Halve a repeat penalty toward zero, flooring a vanished negative at -1.
const fn halve_toward_zero_floored(repeat: i32) -> i32 {
    let halved = match repeat.checked_div(2) {
        Some(v) => v,
        None => 0,
    };
    if repeat < 0 && halved == 0 { -1 } else { halved }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::catalog::{EncounterProfile, RecoveryProfile};
    use crate::notify::{NoOpNotifier, Notifier};
    use crate::observer::{NoOpObserver, TransitionObserver};
    use crate::store::MemoryStore;

    struct Harness {
        gateway: EffectsGateway<MemoryStore>,
        store: Arc<MemoryStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::new(NoOpObserver) as Arc<dyn TransitionObserver>,
            Arc::new(NoOpNotifier) as Arc<dyn Notifier>,
        ));
        let gateway = EffectsGateway::new(engine, Arc::clone(&store));
        Harness { gateway, store }
    }

    #[test]
    fn halving_truncates_toward_zero() {
        assert_eq!(halve_toward_zero_floored(-12), -6);
        assert_eq!(halve_toward_zero_floored(-5), -2);
        assert_eq!(halve_toward_zero_floored(-2), -1);
        assert_eq!(halve_toward_zero_floored(4), 2);
        assert_eq!(halve_toward_zero_floored(0), 0);
    }

    #[test]
    fn vanished_negative_half_floors_at_minus_one() {
        // -1 / 2 truncates to 0; the floor keeps a minimum penalty.
        assert_eq!(halve_toward_zero_floored(-1), -1);
    }

    #[tokio::test]
    async fn first_encounter_applies_first_time_penalty() {
        let h = harness();
        let actor = ActorId::new();

        let outcome = h
            .gateway
            .apply_encounter(actor, "ghoul", "horrific", None)
            .await;
        let outcome = outcome.ok();
        assert_eq!(outcome.as_ref().map(|o| o.encounter_count), Some(1));
        assert_eq!(outcome.as_ref().map(|o| o.acclimated), Some(false));
        // first_time for horrific is -30.
        assert_eq!(
            outcome.map(|o| o.adjustment.new_score),
            Some(70),
        );
    }

    #[tokio::test]
    async fn repeat_encounters_apply_repeat_until_acclimated() {
        let h = harness();
        let actor = ActorId::new();

        // Encounters 1..=6 with the same archetype. horrific: first -30,
        // then repeat -12 for encounters 2..=5, then halved -6 at 6.
        let mut scores = Vec::new();
        for _ in 0..6 {
            let outcome = h
                .gateway
                .apply_encounter(actor, "ghoul", "horrific", None)
                .await;
            if let Ok(o) = outcome {
                scores.push((o.encounter_count, o.acclimated, o.adjustment.new_score));
            }
        }

        assert_eq!(
            scores,
            vec![
                (1, false, 70),  // -30
                (2, false, 58),  // -12
                (3, false, 46),  // -12
                (4, false, 34),  // -12
                (5, false, 22),  // -12
                (6, true, 16),   // -6 (halved)
            ],
        );
    }

    #[tokio::test]
    async fn acclimation_never_eliminates_the_penalty() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::new(NoOpObserver) as Arc<dyn TransitionObserver>,
            Arc::new(NoOpNotifier) as Arc<dyn Notifier>,
        ));
        let gateway = EffectsGateway::new(engine, Arc::clone(&store))
            .with_encounter_catalog(EncounterCatalog::new(BTreeMap::from([(
                String::from("lingering"),
                EncounterProfile { first_time: -3, repeat: -1 },
            )])));

        let actor = ActorId::new();
        let mut last_score = 0;
        for _ in 0..7 {
            let outcome = gateway
                .apply_encounter(actor, "wisp", "lingering", None)
                .await;
            if let Ok(o) = outcome {
                last_score = o.adjustment.new_score;
            }
        }
        // -3 first, then six repeats at -1 each: the unacclimated repeat is
        // -1, and the acclimated half truncates to 0 and floors at -1 --
        // never 0. 100 - 3 - 6 = 91.
        assert_eq!(last_score, 91);
    }

    #[tokio::test]
    async fn archetypes_acclimate_independently() {
        let h = harness();
        let actor = ActorId::new();

        for _ in 0..3 {
            let _ = h
                .gateway
                .apply_encounter(actor, "ghoul", "unsettling", None)
                .await;
        }
        let outcome = h
            .gateway
            .apply_encounter(actor, "shade", "unsettling", None)
            .await;
        // First exposure to a new archetype uses first_time again.
        assert_eq!(outcome.ok().map(|o| o.encounter_count), Some(1));
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_without_mutation() {
        let h = harness();
        let actor = ActorId::new();

        let result = h
            .gateway
            .apply_encounter(actor, "ghoul", "whimsical", None)
            .await;
        assert!(matches!(
            result,
            Err(LucidityError::UnknownEncounterCategory { .. }),
        ));
        // No record was created, no exposure counted.
        assert!(h.store.record(actor).is_none());
        let exposure = h.store.get_exposure(actor, "ghoul").await;
        assert_eq!(exposure.ok().flatten(), None);
    }

    #[tokio::test]
    async fn recovery_applies_delta_and_arms_cooldown() {
        let h = harness();
        let actor = ActorId::new();

        // Dent the score first so the gain is visible.
        let _ = h
            .gateway
            .apply_encounter(actor, "ghoul", "horrific", None)
            .await;

        let outcome = h.gateway.perform_recovery(actor, "commune", None).await;
        assert_eq!(outcome.ok().map(|o| o.new_score), Some(78));

        let remaining = h.gateway.remaining_cooldown(actor, "commune").await;
        assert!(remaining.ok().flatten().is_some());
    }

    #[tokio::test]
    async fn second_recovery_within_cooldown_fails_without_mutation() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h
            .gateway
            .apply_encounter(actor, "ghoul", "horrific", None)
            .await;
        let first = h.gateway.perform_recovery(actor, "commune", None).await;
        let score_after_first = first.ok().map(|o| o.new_score);

        let second = h.gateway.perform_recovery(actor, "commune", None).await;
        assert!(matches!(
            &second,
            Err(LucidityError::OnCooldown { action, remaining })
                if action == "commune" && remaining.num_seconds() > 0,
        ));

        let score_now = h.store.record(actor).map(|r| r.score);
        assert_eq!(score_now, score_after_first);
    }

    #[tokio::test]
    async fn expired_cooldown_allows_another_performance() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h
            .gateway
            .apply_encounter(actor, "ghoul", "horrific", None)
            .await;
        let _ = h.gateway.perform_recovery(actor, "commune", None).await;

        // Backdate the expiry as if the hour had passed.
        let past = Utc::now()
            .checked_sub_signed(TimeDelta::seconds(1))
            .unwrap_or_else(Utc::now);
        let _ = h.store.set_cooldown(actor, "commune", past).await;

        let again = h.gateway.perform_recovery(actor, "commune", None).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn unknown_action_code_is_rejected() {
        let h = harness();
        let result = h
            .gateway
            .perform_recovery(ActorId::new(), "juggling", None)
            .await;
        assert!(matches!(
            result,
            Err(LucidityError::UnknownActionCode { .. }),
        ));
    }

    #[tokio::test]
    async fn custom_recovery_catalog_is_honored() {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::new(NoOpObserver) as Arc<dyn TransitionObserver>,
            Arc::new(NoOpNotifier) as Arc<dyn Notifier>,
        ));
        let gateway = EffectsGateway::new(engine, Arc::clone(&store))
            .with_recovery_catalog(RecoveryCatalog::new(BTreeMap::from([(
                String::from("hum_quietly"),
                RecoveryProfile {
                    delta: 1,
                    cooldown: TimeDelta::seconds(30),
                },
            )])));

        let actor = ActorId::new();
        // Stock codes are gone.
        let stock = gateway.perform_recovery(actor, "commune", None).await;
        assert!(matches!(stock, Err(LucidityError::UnknownActionCode { .. })));

        let custom = gateway.perform_recovery(actor, "hum_quietly", None).await;
        assert!(custom.is_ok());
    }
}

//! The adjustment engine: the single authoritative path for mutating an
//! actor's lucidity score.
//!
//! Every caller -- flux scheduler, effects gateway, admin tooling -- goes
//! through [`AdjustmentEngine::apply`]. One call performs the whole step:
//! clamp, tier resolution, threshold-crossing detection, liability roll,
//! atomic persist of record + log entry, then observer and transport
//! fan-out. Storage failures abort the step with no partial writes; the
//! downstream fan-out runs only after the commit and can never roll it
//! back.
//!
//! Three downward thresholds are evaluated independently on every apply:
//! the terminal tier boundary (score <= 0), the acute-crisis threshold
//! (score <= -10), and the absolute floor (score <= -100). Their effects
//! differ (registry membership, respawn hook, emergency relocation) and
//! none implies another.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use murkveil_types::{
    ActorId, AdjustmentId, AdjustmentLogEntry, AdjustmentSource, CrisisEvent, CrisisStatus,
    Liability, LocationId, LucidityEvent, LucidityTier, SCORE_MAX, SCORE_MIN, StateChangedEvent,
};

use crate::catalog::LiabilityCatalog;
use crate::config::LucidityConfig;
use crate::error::{LucidityError, StoreError};
use crate::notify::Notifier;
use crate::observer::TransitionObserver;
use crate::store::LucidityStore;
use crate::tier::resolve_tier;

/// Client-facing summary attached to the terminal-tier crisis event.
const CATATONIA_MESSAGE: &str = "A great stillness takes hold.";

/// Client-facing summary attached to the terminal-exit crisis event.
const CATATONIA_LIFTED_MESSAGE: &str = "Awareness claws its way back.";

/// Client-facing summary attached to the acute-crisis event.
const DELIRIUM_MESSAGE: &str = "The world dissolves into fever.";

/// Client-facing summary attached to the absolute-floor event.
const FLOOR_MESSAGE: &str = "The mind has gone where none can follow.";

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// Parameters for one adjustment.
///
/// Packs the arguments of [`AdjustmentEngine::apply`] into a single struct
/// to satisfy clippy's argument count limit and improve call-site
/// readability.
#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    /// The actor to adjust.
    pub actor_id: ActorId,
    /// Signed delta to apply before clamping.
    pub delta: i32,
    /// Reason code, e.g. `"passive_flux"` or `"encounter_horrific"`.
    pub reason: String,
    /// Originating subsystem.
    pub source: AdjustmentSource,
    /// Optional factor breakdown recorded on the log entry.
    pub metadata: Option<Value>,
    /// Where the adjustment happened, when known.
    pub location_id: Option<LocationId>,
}

impl AdjustmentRequest {
    /// Create a request with no metadata or location.
    pub fn new(
        actor_id: ActorId,
        delta: i32,
        reason: impl Into<String>,
        source: AdjustmentSource,
    ) -> Self {
        Self {
            actor_id,
            delta,
            reason: reason.into(),
            source,
            metadata: None,
            location_id: None,
        }
    }

    /// Attach a factor breakdown.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach the location the adjustment happened at.
    #[must_use]
    pub const fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }
}

/// Result of one applied adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentOutcome {
    /// Score before the adjustment.
    pub previous_score: i32,
    /// Score after clamping.
    pub new_score: i32,
    /// Tier before the adjustment.
    pub previous_tier: LucidityTier,
    /// Tier after the adjustment.
    pub new_tier: LucidityTier,
    /// The requested delta (the clamp may have absorbed part of it).
    pub delta: i32,
    /// Liability codes rolled by this adjustment (new or stacked).
    pub liabilities_added: Vec<String>,
}

impl AdjustmentOutcome {
    /// Whether the tier changed in either direction.
    pub fn tier_changed(&self) -> bool {
        self.previous_tier != self.new_tier
    }

    /// Whether the tier strictly worsened.
    pub fn tier_worsened(&self) -> bool {
        self.new_tier > self.previous_tier
    }
}

/// Threshold crossings detected while computing an adjustment, dispatched
/// after the record commits.
struct Crossings {
    entered_terminal: Option<chrono::DateTime<Utc>>,
    left_terminal: bool,
    acute_crisis: bool,
    floor: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The single authoritative mutation path for lucidity scores.
pub struct AdjustmentEngine<S> {
    store: Arc<S>,
    observer: Arc<dyn TransitionObserver>,
    notifier: Arc<dyn Notifier>,
    liabilities: LiabilityCatalog,
    config: LucidityConfig,
}

impl<S: LucidityStore> AdjustmentEngine<S> {
    /// Create an engine with the default liability catalog and config.
    pub fn new(
        store: Arc<S>,
        observer: Arc<dyn TransitionObserver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            observer,
            notifier,
            liabilities: LiabilityCatalog::default(),
            config: LucidityConfig::default(),
        }
    }

    /// Replace the liability catalog.
    #[must_use]
    pub fn with_liability_catalog(mut self, liabilities: LiabilityCatalog) -> Self {
        self.liabilities = liabilities;
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub const fn with_config(mut self, config: LucidityConfig) -> Self {
        self.config = config;
        self
    }

    /// Return the store this engine writes through.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Apply an adjustment to an actor's score.
    ///
    /// Retries a bounded number of times when the store reports a version
    /// conflict (another writer committed between our read and save); all
    /// other errors surface immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LucidityError::Storage`] when the store fails or the
    /// conflict retries are exhausted.
    pub async fn apply(
        &self,
        request: AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, LucidityError> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_apply(&request).await {
                Err(LucidityError::Storage {
                    source: StoreError::Conflict { .. },
                }) if attempt < self.config.conflict_retries => {
                    attempt = attempt.saturating_add(1);
                    debug!(
                        actor_id = %request.actor_id,
                        attempt,
                        "version conflict, retrying apply"
                    );
                }
                result => return result,
            }
        }
    }

    /// One full read-compute-persist-notify cycle.
    #[allow(clippy::too_many_lines)]
    async fn try_apply(
        &self,
        request: &AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, LucidityError> {
        let mut record = self.store.get_or_create(request.actor_id).await?;

        let previous_score = record.score;
        let previous_tier = record.tier;
        let new_score = previous_score
            .saturating_add(request.delta)
            .clamp(SCORE_MIN, SCORE_MAX);
        let new_tier = resolve_tier(new_score);

        // Terminal-tier transition: stamp on entry, clear on exit.
        let mut crossings = Crossings {
            entered_terminal: None,
            left_terminal: false,
            acute_crisis: false,
            floor: false,
        };
        if new_tier == LucidityTier::Terminal {
            if record.catatonia_entered_at.is_none() {
                let stamp = Utc::now();
                record.catatonia_entered_at = Some(stamp);
                crossings.entered_terminal = Some(stamp);
            }
        } else if record.catatonia_entered_at.is_some() {
            record.catatonia_entered_at = None;
            crossings.left_terminal = true;
        }

        // Acute crisis and absolute floor: independent downward crossings,
        // evaluated even when the tier did not change. Clamping makes both
        // predicates naturally idempotent while pinned at the boundary.
        crossings.acute_crisis = new_score <= self.config.crisis_threshold
            && previous_score > self.config.crisis_threshold;
        crossings.floor = new_score <= SCORE_MIN && previous_score > SCORE_MIN;

        // Liability roll on severe or worsening loss.
        let mut liabilities_added = Vec::new();
        let severe_loss = request.delta < 0
            && request.delta.unsigned_abs() >= self.config.loss_threshold;
        let worsened = new_tier > previous_tier;
        if severe_loss || worsened {
            let mut rng = rand::rng();
            if let Some(code) = self.liabilities.pick(&record, &mut rng) {
                let code = code.to_owned();
                if let Some(existing) =
                    record.liabilities.iter_mut().find(|l| l.code == code)
                {
                    existing.stacks = existing.stacks.saturating_add(1);
                } else {
                    record.liabilities.push(Liability {
                        code: code.clone(),
                        stacks: 1,
                    });
                }
                liabilities_added.push(code);
            }
        }

        record.score = new_score;
        record.tier = new_tier;

        let entry = AdjustmentLogEntry {
            id: AdjustmentId::new(),
            actor_id: request.actor_id,
            delta: request.delta,
            reason: request.reason.clone(),
            source: request.source,
            metadata: request.metadata.clone().unwrap_or(Value::Null),
            location_id: request.location_id,
            created_at: Utc::now(),
        };

        // Record and log entry commit together or not at all. Everything
        // after this point is fan-out that must not abort the step.
        self.store.save_adjustment(&record, &entry).await?;

        let outcome = AdjustmentOutcome {
            previous_score,
            new_score,
            previous_tier,
            new_tier,
            delta: request.delta,
            liabilities_added,
        };

        if outcome.tier_changed() {
            info!(
                actor_id = %request.actor_id,
                previous_tier = ?previous_tier,
                new_tier = ?new_tier,
                score = new_score,
                reason = %request.reason,
                "lucidity tier changed"
            );
        } else {
            debug!(
                actor_id = %request.actor_id,
                delta = request.delta,
                score = new_score,
                reason = %request.reason,
                "lucidity adjusted"
            );
        }

        self.dispatch(request, &record.liabilities, &outcome, &crossings);

        Ok(outcome)
    }

    /// Post-commit fan-out to the observer and the transport.
    fn dispatch(
        &self,
        request: &AdjustmentRequest,
        liabilities: &[Liability],
        outcome: &AdjustmentOutcome,
        crossings: &Crossings,
    ) {
        if let Some(entered_at) = crossings.entered_terminal {
            self.observer
                .on_catatonia_entered(request.actor_id, entered_at);
            self.notify_crisis(request.actor_id, outcome.new_score, CrisisStatus::Catatonia);
        }
        if crossings.left_terminal {
            self.observer.on_catatonia_cleared(request.actor_id);
            self.notify_crisis(
                request.actor_id,
                outcome.new_score,
                CrisisStatus::CatatoniaLifted,
            );
        }
        if crossings.acute_crisis {
            self.notify_crisis(request.actor_id, outcome.new_score, CrisisStatus::Delirium);
        }
        if crossings.floor {
            self.observer
                .on_floor_reached(request.actor_id, outcome.new_score);
            self.notify_crisis(request.actor_id, outcome.new_score, CrisisStatus::Floor);
        }

        if request.delta != 0 || outcome.tier_changed() {
            self.notifier
                .notify(LucidityEvent::StateChanged(StateChangedEvent {
                    actor_id: request.actor_id,
                    score: outcome.new_score,
                    score_capped: outcome.new_score.min(self.config.score_cap),
                    delta: request.delta,
                    tier: outcome.new_tier,
                    liabilities: liabilities.to_vec(),
                    reason: request.reason.clone(),
                    source: request.source,
                    metadata: request.metadata.clone().unwrap_or(Value::Null),
                }));
        }
    }

    fn notify_crisis(&self, actor_id: ActorId, score: i32, status: CrisisStatus) {
        let message = match status {
            CrisisStatus::Catatonia => CATATONIA_MESSAGE,
            CrisisStatus::CatatoniaLifted => CATATONIA_LIFTED_MESSAGE,
            CrisisStatus::Delirium => DELIRIUM_MESSAGE,
            CrisisStatus::Floor => FLOOR_MESSAGE,
        };
        self.notifier.notify(LucidityEvent::Crisis(CrisisEvent {
            actor_id,
            score,
            message: String::from(message),
            status,
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::{DateTime, Utc};
    use murkveil_types::{ExposureState, LucidityRecord};

    use super::*;
    use crate::store::MemoryStore;

    // -- test doubles -------------------------------------------------------

    #[derive(Default)]
    struct RecordingObserver {
        entered: Mutex<Vec<ActorId>>,
        cleared: Mutex<Vec<ActorId>>,
        floors: Mutex<Vec<(ActorId, i32)>>,
    }

    impl TransitionObserver for RecordingObserver {
        fn on_catatonia_entered(&self, actor_id: ActorId, _entered_at: DateTime<Utc>) {
            if let Ok(mut entered) = self.entered.lock() {
                entered.push(actor_id);
            }
        }

        fn on_catatonia_cleared(&self, actor_id: ActorId) {
            if let Ok(mut cleared) = self.cleared.lock() {
                cleared.push(actor_id);
            }
        }

        fn on_floor_reached(&self, actor_id: ActorId, score: i32) {
            if let Ok(mut floors) = self.floors.lock() {
                floors.push((actor_id, score));
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<LucidityEvent>>,
    }

    impl RecordingNotifier {
        fn events(&self) -> Vec<LucidityEvent> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }

        fn crisis_count(&self, status: CrisisStatus) -> usize {
            self.events()
                .iter()
                .filter(|e| matches!(e, LucidityEvent::Crisis(c) if c.status == status))
                .count()
        }

        fn state_changes(&self) -> Vec<StateChangedEvent> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    LucidityEvent::StateChanged(s) => Some(s),
                    _ => None,
                })
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: LucidityEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }

    /// Store wrapper that injects failures into `save_adjustment`.
    struct FlakyStore {
        inner: MemoryStore,
        conflicts_left: AtomicU32,
        unavailable_left: AtomicU32,
    }

    impl FlakyStore {
        fn new(conflicts: u32, unavailable: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                conflicts_left: AtomicU32::new(conflicts),
                unavailable_left: AtomicU32::new(unavailable),
            }
        }
    }

    impl LucidityStore for FlakyStore {
        async fn get_or_create(&self, actor_id: ActorId) -> Result<LucidityRecord, StoreError> {
            self.inner.get_or_create(actor_id).await
        }

        async fn save_adjustment(
            &self,
            record: &LucidityRecord,
            entry: &AdjustmentLogEntry,
        ) -> Result<(), StoreError> {
            if self
                .conflicts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Conflict {
                    actor_id: record.actor_id,
                });
            }
            if self
                .unavailable_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable {
                    message: String::from("injected outage"),
                });
            }
            self.inner.save_adjustment(record, entry).await
        }

        async fn get_exposure(
            &self,
            actor_id: ActorId,
            archetype: &str,
        ) -> Result<Option<ExposureState>, StoreError> {
            self.inner.get_exposure(actor_id, archetype).await
        }

        async fn increment_exposure(
            &self,
            actor_id: ActorId,
            archetype: &str,
            at: DateTime<Utc>,
        ) -> Result<u32, StoreError> {
            self.inner.increment_exposure(actor_id, archetype, at).await
        }

        async fn get_cooldown(
            &self,
            actor_id: ActorId,
            action: &str,
        ) -> Result<Option<DateTime<Utc>>, StoreError> {
            self.inner.get_cooldown(actor_id, action).await
        }

        async fn set_cooldown(
            &self,
            actor_id: ActorId,
            action: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.inner.set_cooldown(actor_id, action, expires_at).await
        }

        async fn list_active_actors(
            &self,
            active_since: DateTime<Utc>,
            created_since: DateTime<Utc>,
        ) -> Result<Vec<ActorId>, StoreError> {
            self.inner.list_active_actors(active_since, created_since).await
        }
    }

    struct Harness {
        engine: AdjustmentEngine<MemoryStore>,
        store: Arc<MemoryStore>,
        observer: Arc<RecordingObserver>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let observer = Arc::new(RecordingObserver::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::clone(&observer) as Arc<dyn TransitionObserver>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        Harness {
            engine,
            store,
            observer,
            notifier,
        }
    }

    fn request(actor_id: ActorId, delta: i32, reason: &str) -> AdjustmentRequest {
        AdjustmentRequest::new(actor_id, delta, reason, AdjustmentSource::System)
    }

    async fn score_of(h: &Harness, actor_id: ActorId) -> i32 {
        h.store.record(actor_id).map_or(i32::MIN, |r| r.score)
    }

    // -- clamping and tiers -------------------------------------------------

    #[tokio::test]
    async fn saturation_at_upper_boundary() {
        let h = harness();
        let actor = ActorId::new();

        // +10 at a fresh 100 saturates: no change.
        let up = h.engine.apply(request(actor, 10, "test_gain")).await;
        assert_eq!(up.ok().map(|o| o.new_score), Some(100));

        // The saturated gain is gone: -10 lands at 90, not back at 100.
        let down = h.engine.apply(request(actor, -10, "test_loss")).await;
        assert_eq!(down.ok().map(|o| o.new_score), Some(90));
        assert_eq!(score_of(&h, actor).await, 90);
    }

    #[tokio::test]
    async fn saturation_at_lower_boundary() {
        let h = harness();
        let actor = ActorId::new();

        let floor = h.engine.apply(request(actor, -400, "test_plummet")).await;
        assert_eq!(floor.ok().map(|o| o.new_score), Some(-100));

        // Further loss saturates at the floor.
        let more = h.engine.apply(request(actor, -10, "test_loss")).await;
        assert_eq!(more.ok().map(|o| o.new_score), Some(-100));

        // Recovery is not absorbed.
        let up = h.engine.apply(request(actor, 10, "test_gain")).await;
        assert_eq!(up.ok().map(|o| o.new_score), Some(-90));
    }

    #[tokio::test]
    async fn tier_matches_score_after_every_apply() {
        let h = harness();
        let actor = ActorId::new();

        for delta in [-37, -250, 90, 4, -1, 300, -64, 0, 12] {
            let outcome = h.engine.apply(request(actor, delta, "test_sweep")).await;
            let outcome = outcome.ok();
            let score = outcome.as_ref().map_or(i32::MIN, |o| o.new_score);
            assert!((-100..=100).contains(&score));
            assert_eq!(
                outcome.map(|o| o.new_tier),
                Some(crate::tier::resolve_tier(score)),
            );
            let record = h.store.record(actor);
            assert_eq!(
                record.map(|r| r.tier),
                Some(crate::tier::resolve_tier(score)),
            );
        }
    }

    // -- threshold crossings ------------------------------------------------

    #[tokio::test]
    async fn acute_crisis_fires_once_even_with_tier_change() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h.engine.apply(request(actor, -95, "test_setup")).await;
        assert_eq!(score_of(&h, actor).await, 5);

        let outcome = h.engine.apply(request(actor, -20, "test_crisis")).await;
        assert_eq!(outcome.ok().map(|o| o.new_score), Some(-15));
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Delirium), 1);

        // Already below the threshold: no re-fire.
        let _ = h.engine.apply(request(actor, -5, "test_deeper")).await;
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Delirium), 1);
    }

    #[tokio::test]
    async fn floor_event_is_once_per_crossing() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h.engine.apply(request(actor, -400, "test_plummet")).await;
        assert_eq!(h.observer.floors.lock().map(|f| f.len()).ok(), Some(1));
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Floor), 1);

        // Pinned at the floor: no re-fire.
        let _ = h.engine.apply(request(actor, -50, "test_pinned")).await;
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Floor), 1);

        // Rise above, then fall back: fires again.
        let _ = h.engine.apply(request(actor, 5, "test_respite")).await;
        let _ = h.engine.apply(request(actor, -10, "test_relapse")).await;
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Floor), 2);
        assert_eq!(h.observer.floors.lock().map(|f| f.len()).ok(), Some(2));
    }

    #[tokio::test]
    async fn catatonia_stamp_tracks_terminal_tier() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h.engine.apply(request(actor, -100, "test_collapse")).await;
        let record = h.store.record(actor);
        assert_eq!(record.as_ref().map(|r| r.tier), Some(LucidityTier::Terminal));
        assert!(record.as_ref().is_some_and(|r| r.catatonia_entered_at.is_some()));
        assert_eq!(h.observer.entered.lock().map(|e| e.len()).ok(), Some(1));

        let _ = h.engine.apply(request(actor, 30, "test_recovery")).await;
        let record = h.store.record(actor);
        assert!(record.as_ref().is_some_and(|r| r.catatonia_entered_at.is_none()));
        assert_eq!(h.observer.cleared.lock().map(|c| c.len()).ok(), Some(1));
        assert_eq!(h.notifier.crisis_count(CrisisStatus::CatatoniaLifted), 1);
    }

    #[tokio::test]
    async fn one_apply_can_cross_all_three_thresholds() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h.engine.apply(request(actor, -300, "test_oblivion")).await;
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Catatonia), 1);
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Delirium), 1);
        assert_eq!(h.notifier.crisis_count(CrisisStatus::Floor), 1);
    }

    // -- liabilities --------------------------------------------------------

    #[tokio::test]
    async fn severe_loss_rolls_a_liability() {
        let h = harness();
        let actor = ActorId::new();

        let outcome = h.engine.apply(request(actor, -15, "test_severe")).await;
        assert_eq!(outcome.ok().map(|o| o.liabilities_added.len()), Some(1));
        let record = h.store.record(actor);
        assert_eq!(record.map(|r| r.liabilities.len()), Some(1));
    }

    #[tokio::test]
    async fn small_loss_within_tier_rolls_nothing() {
        let h = harness();
        let actor = ActorId::new();

        // -14 keeps the actor Stable (86) and is under the loss threshold.
        let outcome = h.engine.apply(request(actor, -14, "test_minor")).await;
        let outcome = outcome.ok();
        assert_eq!(outcome.as_ref().map(|o| o.new_score), Some(86));
        assert_eq!(
            outcome.map(|o| o.liabilities_added.len()),
            Some(0),
        );
    }

    #[tokio::test]
    async fn horrific_encounter_scenario() {
        let h = harness();
        let actor = ActorId::new();

        // Bring the actor to 45 (uneasy). -55 itself rolls one liability.
        let _ = h.engine.apply(request(actor, -55, "test_setup")).await;

        let outcome = h
            .engine
            .apply(request(actor, -30, "encounter_horrific"))
            .await;
        let outcome = outcome.ok();
        assert_eq!(outcome.as_ref().map(|o| o.new_score), Some(15));
        assert_eq!(
            outcome.as_ref().map(|o| o.new_tier),
            Some(LucidityTier::Deranged),
        );
        assert_eq!(outcome.map(|o| o.liabilities_added.len()), Some(1));

        // Two rolls total: either two distinct codes or one code stacked.
        let total_stacks: u32 = h
            .store
            .record(actor)
            .map(|r| r.liabilities.iter().map(|l| l.stacks).sum())
            .unwrap_or(0);
        assert_eq!(total_stacks, 2);
    }

    // -- notifications ------------------------------------------------------

    #[tokio::test]
    async fn zero_delta_without_tier_change_is_silent() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h.engine.apply(request(actor, 0, "test_noop")).await;
        assert!(h.notifier.state_changes().is_empty());

        // The log entry still exists: one row per applied adjustment.
        assert_eq!(h.store.adjustment_log().len(), 1);
    }

    #[tokio::test]
    async fn state_change_carries_capped_score_and_liabilities() {
        let h = harness();
        let actor = ActorId::new();

        let _ = h.engine.apply(request(actor, -40, "test_drop")).await;
        let changes = h.notifier.state_changes();
        let last = changes.last();
        assert_eq!(last.map(|e| e.score), Some(60));
        assert_eq!(last.map(|e| e.score_capped), Some(60));
        assert_eq!(last.map(|e| e.tier), Some(LucidityTier::Uneasy));
        assert!(last.is_some_and(|e| !e.liabilities.is_empty()));
    }

    // -- storage behavior ---------------------------------------------------

    #[tokio::test]
    async fn conflicts_are_retried_and_succeed() {
        let store = Arc::new(FlakyStore::new(2, 0));
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::new(crate::observer::NoOpObserver) as Arc<dyn TransitionObserver>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );

        let actor = ActorId::new();
        let outcome = engine.apply(request(actor, -5, "test_retry")).await;
        assert_eq!(outcome.ok().map(|o| o.new_score), Some(95));
        assert_eq!(store.inner.adjustment_log().len(), 1);
    }

    #[tokio::test]
    async fn storage_outage_aborts_with_no_partial_writes() {
        let store = Arc::new(FlakyStore::new(0, 1));
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = AdjustmentEngine::new(
            Arc::clone(&store),
            Arc::new(crate::observer::NoOpObserver) as Arc<dyn TransitionObserver>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );

        let actor = ActorId::new();
        let result = engine.apply(request(actor, -40, "test_outage")).await;
        assert!(matches!(
            result,
            Err(LucidityError::Storage {
                source: StoreError::Unavailable { .. }
            }),
        ));

        // Nothing committed, nothing dispatched.
        assert_eq!(store.inner.record(actor).map(|r| r.score), Some(100));
        assert!(store.inner.adjustment_log().is_empty());
        assert!(notifier.events().is_empty());
    }
}

//! The transition observer protocol.
//!
//! The adjustment engine fans tier transitions and the absolute-floor
//! crossing out through this interface without knowing who listens. The
//! catatonia registry is the primary implementation; tests and headless
//! tools use [`NoOpObserver`].
//!
//! Callbacks run synchronously on the engine's write path after the record
//! has committed, so implementations must be quick and must never block.
//! Anything long-running belongs behind a spawned task (see the registry's
//! failover dispatch).

use chrono::{DateTime, Utc};
use murkveil_types::ActorId;

/// Receiver of tier-transition and floor-crossing notifications.
pub trait TransitionObserver: Send + Sync {
    /// The actor entered the terminal tier.
    fn on_catatonia_entered(&self, actor_id: ActorId, entered_at: DateTime<Utc>);

    /// The actor left the terminal tier.
    fn on_catatonia_cleared(&self, actor_id: ActorId);

    /// The actor crossed the absolute floor (score <= -100). Fired exactly
    /// once per crossing; sitting at the floor does not re-fire.
    fn on_floor_reached(&self, actor_id: ActorId, score: i32);
}

/// An observer that ignores every notification. For tests.
pub struct NoOpObserver;

impl TransitionObserver for NoOpObserver {
    fn on_catatonia_entered(&self, _actor_id: ActorId, _entered_at: DateTime<Utc>) {}

    fn on_catatonia_cleared(&self, _actor_id: ActorId) {}

    fn on_floor_reached(&self, _actor_id: ActorId, _score: i32) {}
}

//! Event payloads pushed to the notification transport.
//!
//! The transport itself (NATS subjects, session routing) lives outside this
//! subsystem; these are the wire shapes it receives. All events are
//! fire-and-forget from the ledger's point of view: a dispatch failure is
//! logged and never rolls back the adjustment that produced it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::enums::{AdjustmentSource, CrisisStatus, LucidityTier};
use crate::ids::{ActorId, LocationId};
use crate::records::Liability;

/// State-change event emitted after an applied adjustment with a non-zero
/// delta or a tier change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateChangedEvent {
    /// The adjusted actor.
    pub actor_id: ActorId,
    /// Current score after the adjustment.
    pub score: i32,
    /// Score capped to the configured maximum, for client display.
    pub score_capped: i32,
    /// The requested delta.
    pub delta: i32,
    /// Tier after the adjustment.
    pub tier: LucidityTier,
    /// Current liabilities.
    pub liabilities: Vec<Liability>,
    /// Reason code of the originating adjustment.
    pub reason: String,
    /// Originating subsystem.
    pub source: AdjustmentSource,
    /// Factor breakdown copied from the adjustment.
    pub metadata: Value,
}

/// Crisis event shared by the terminal-tier, acute-crisis, and
/// absolute-floor crossings; `status` distinguishes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrisisEvent {
    /// The actor crossing a threshold.
    pub actor_id: ActorId,
    /// Score at the time of the crossing.
    pub score: i32,
    /// Human-readable summary for client messaging.
    pub message: String,
    /// Which threshold fired.
    pub status: CrisisStatus,
}

/// Hallucination event produced by a timer-gated check on an impaired actor.
///
/// Carries no score change; the narrative layer decides presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HallucinationEvent {
    /// The hallucinating actor.
    pub actor_id: ActorId,
    /// Where it happened, when known.
    pub location_id: Option<LocationId>,
    /// The actor's tier at roll time.
    pub tier: LucidityTier,
}

/// Union of everything the subsystem pushes to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LucidityEvent {
    /// Score or tier changed.
    StateChanged(StateChangedEvent),
    /// A crisis threshold was crossed.
    Crisis(CrisisEvent),
    /// A hallucination check triggered.
    Hallucination(HallucinationEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_union_is_tagged() {
        let event = LucidityEvent::Crisis(CrisisEvent {
            actor_id: ActorId::new(),
            score: -12,
            message: String::from("The world tilts sideways."),
            status: CrisisStatus::Delirium,
        });
        let json = serde_json::to_value(&event).ok();
        assert_eq!(
            json.as_ref().and_then(|v| v.get("kind")).and_then(Value::as_str),
            Some("crisis"),
        );
        assert_eq!(
            json.as_ref().and_then(|v| v.get("status")).and_then(Value::as_str),
            Some("delirium"),
        );
    }
}

//! Shared type definitions for the Murkveil lucidity subsystem.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries in this workspace. Event payload types flow downstream to
//! `TypeScript` via `ts-rs` for the client dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for actor/location/adjustment IDs
//! - [`enums`] -- Tiers, adjustment sources, crisis statuses, world vocabulary
//! - [`records`] -- Durable record shapes (lucidity record, adjustment log, exposure)
//! - [`events`] -- Notification-transport payloads

pub mod enums;
pub mod events;
pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use enums::{AdjustmentSource, CrisisStatus, DayPhase, LocationKind, LucidityTier};
pub use events::{CrisisEvent, HallucinationEvent, LucidityEvent, StateChangedEvent};
pub use ids::{ActorId, AdjustmentId, LocationId};
pub use records::{
    AdjustmentLogEntry, ExposureState, Liability, LucidityRecord, SCORE_MAX, SCORE_MIN,
    STARTING_SCORE,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. Importing them here triggers generation.
        // The actual files are written to the `bindings/` directory
        // relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::ActorId::export_all();
        let _ = crate::ids::LocationId::export_all();
        let _ = crate::ids::AdjustmentId::export_all();

        // Enums
        let _ = crate::enums::LucidityTier::export_all();
        let _ = crate::enums::AdjustmentSource::export_all();
        let _ = crate::enums::CrisisStatus::export_all();
        let _ = crate::enums::LocationKind::export_all();
        let _ = crate::enums::DayPhase::export_all();

        // Records
        let _ = crate::records::Liability::export_all();
        let _ = crate::records::LucidityRecord::export_all();
        let _ = crate::records::AdjustmentLogEntry::export_all();
        let _ = crate::records::ExposureState::export_all();

        // Events
        let _ = crate::events::StateChangedEvent::export_all();
        let _ = crate::events::CrisisEvent::export_all();
        let _ = crate::events::HallucinationEvent::export_all();
        let _ = crate::events::LucidityEvent::export_all();
    }
}

//! Flux scheduler for the Murkveil lucidity subsystem.
//!
//! Passive environmental and social drift, applied once per cadence across
//! every eligible actor without serializing the world. The scheduler owns
//! all per-actor carry state (fractional residuals, resistance counters)
//! and hands whole-unit deltas to the adjustment engine.
//!
//! # Modules
//!
//! - [`config`] -- Scheduler tunables ([`FluxConfig`])
//! - [`error`] -- Error types ([`FluxError`])
//! - [`hallucination`] -- Timer-gated hallucination checks
//! - [`rate`] -- Override hierarchy and world overrides ([`FluxRates`], [`WorldOverrideMap`])
//! - [`residual`] -- Fractional-residual carryover
//! - [`scheduler`] -- The cadence loop ([`FluxScheduler`])
//! - [`tracker`] -- Scheduler-private per-actor state and adaptive resistance
//! - [`world`] -- Read-only geography/presence interface ([`WorldView`])

pub mod config;
pub mod error;
pub mod hallucination;
pub mod rate;
pub mod residual;
pub mod scheduler;
pub mod tracker;
pub mod world;

// Re-export primary types at crate root for convenience.
pub use config::FluxConfig;
pub use error::FluxError;
pub use hallucination::{HALLUCINATION_SLOT, HallucinationConfig};
pub use rate::{DayNightRate, FluxRates, RateRung, WILDCARD, WorldOverrideMap};
pub use scheduler::{CadenceSummary, FluxScheduler};
pub use tracker::{FluxTracker, TrackerTable};
pub use world::{LocationProfile, MemoryWorld, WorldView, WorldViewError};

//! Error types for the flux scheduler.

use murkveil_lucidity::LucidityError;

use crate::world::WorldViewError;

/// Errors that can occur while processing a cadence.
///
/// Per-actor failures are logged and counted in the cadence summary rather
/// than aborting the sweep; a failed eligibility scan skips the whole
/// firing and retries on the next one.
#[derive(Debug, thiserror::Error)]
pub enum FluxError {
    /// The lucidity core rejected or failed an operation.
    #[error("lucidity error: {source}")]
    Lucidity {
        /// The underlying lucidity error.
        #[from]
        source: LucidityError,
    },

    /// The world view could not resolve an actor's surroundings.
    #[error("world view error: {source}")]
    World {
        /// The underlying world view error.
        #[from]
        source: WorldViewError,
    },
}

//! Live world view over NATS request-reply.
//!
//! The world service owns geography and presence; the flux scheduler asks
//! it where each eligible actor stands via a locate request. A `null` or
//! empty reply means the actor is not placed right now and is skipped for
//! the cadence.

use std::time::Duration;

use serde_json::json;

use murkveil_flux::{LocationProfile, WorldView, WorldViewError};
use murkveil_types::ActorId;

/// Subject the world service answers locate requests on.
const LOCATE_SUBJECT: &str = "murkveil.world.locate";

/// Default bound on a locate round trip.
const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(2);

/// [`WorldView`] backed by the world service's NATS locate endpoint.
pub struct NatsWorldView {
    client: async_nats::Client,
    timeout: Duration,
}

impl NatsWorldView {
    /// Create a view over a connected client.
    pub const fn new(client: async_nats::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_LOCATE_TIMEOUT,
        }
    }

    /// Set the locate round-trip timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl WorldView for NatsWorldView {
    async fn locate(
        &self,
        actor_id: ActorId,
    ) -> Result<Option<LocationProfile>, WorldViewError> {
        let payload = serde_json::to_vec(&json!({ "actor_id": actor_id })).map_err(|e| {
            WorldViewError {
                message: format!("locate payload: {e}"),
            }
        })?;

        let response = tokio::time::timeout(
            self.timeout,
            self.client.request(LOCATE_SUBJECT, payload.into()),
        )
        .await
        .map_err(|_| WorldViewError {
            message: String::from("locate request timed out"),
        })?
        .map_err(|e| WorldViewError {
            message: format!("locate request: {e}"),
        })?;

        if response.payload.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice::<Option<LocationProfile>>(&response.payload).map_err(|e| {
            WorldViewError {
                message: format!("locate reply decode: {e}"),
            }
        })
    }
}

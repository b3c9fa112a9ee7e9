//! Emergency-relocation failover hook.
//!
//! When an actor hits the absolute floor, the catatonia registry fires
//! this hook as a supervised background task. It publishes a relocation
//! request to the world service over NATS; whoever subscribes owns the
//! actual move. Errors here are logged by the registry and never reach
//! the write path that triggered the crossing.

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::debug;

use murkveil_lucidity::{FailoverError, FailoverHook};
use murkveil_types::ActorId;

/// Subject the world service listens on for emergency relocations.
const RELOCATE_SUBJECT: &str = "murkveil.lucidity.relocate";

/// Relocation request payload.
#[derive(Debug, Serialize)]
struct RelocationRequest {
    actor_id: ActorId,
    score: i32,
    reason: &'static str,
}

/// [`FailoverHook`] that publishes relocation requests over NATS.
pub struct NatsFailover {
    client: async_nats::Client,
}

impl NatsFailover {
    /// Create a hook over a connected client.
    pub const fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

impl FailoverHook for NatsFailover {
    fn dispatch(
        &self,
        actor_id: ActorId,
        score: i32,
    ) -> BoxFuture<'static, Result<(), FailoverError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let request = RelocationRequest {
                actor_id,
                score,
                reason: "floor_reached",
            };
            let payload = serde_json::to_vec(&request).map_err(|e| FailoverError {
                message: format!("relocation payload: {e}"),
            })?;
            client
                .publish(RELOCATE_SUBJECT, payload.into())
                .await
                .map_err(|e| FailoverError {
                    message: format!("relocation publish: {e}"),
                })?;
            debug!(%actor_id, score, "relocation request published");
            Ok(())
        })
    }
}

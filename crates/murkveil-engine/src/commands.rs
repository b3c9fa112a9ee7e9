//! NATS command listener for triggered effects.
//!
//! The command layer (parser, session routing) lives outside this
//! subsystem; it reaches the gateway over two request subjects. Each
//! subject gets its own subscription task; requests carry JSON payloads
//! and get a JSON reply when the requester asked for one.

use std::sync::Arc;

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use murkveil_lucidity::{EffectsGateway, LucidityError, LucidityStore};
use murkveil_types::{ActorId, LocationId, LucidityTier};

use crate::error::EngineError;

/// Subject for encounter-loss commands.
const ENCOUNTER_SUBJECT: &str = "murkveil.lucidity.cmd.encounter";

/// Subject for recovery-ritual commands.
const RECOVERY_SUBJECT: &str = "murkveil.lucidity.cmd.recovery";

/// Encounter-loss request payload.
#[derive(Debug, Deserialize)]
pub struct EncounterCommand {
    /// The actor who suffered the encounter.
    pub actor_id: ActorId,
    /// Archetype of the hostile (drives acclimation).
    pub archetype: String,
    /// Encounter category (catalog key).
    pub category: String,
    /// Where it happened, when known.
    pub location_id: Option<LocationId>,
}

/// Recovery-ritual request payload.
#[derive(Debug, Deserialize)]
pub struct RecoveryCommand {
    /// The performing actor.
    pub actor_id: ActorId,
    /// Recovery action code (catalog key).
    pub action: String,
    /// Where it happened, when known.
    pub location_id: Option<LocationId>,
}

/// Reply sent back to the requester.
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandReply {
    /// The effect applied.
    Applied {
        /// The adjusted actor.
        actor_id: ActorId,
        /// Score after the adjustment.
        score: i32,
        /// Tier after the adjustment.
        tier: LucidityTier,
        /// The delta that was applied.
        delta: i32,
    },
    /// The command was rejected; nothing was mutated.
    Rejected {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable detail.
        message: String,
    },
}

/// Stable machine-readable code for a rejection.
const fn error_code(error: &LucidityError) -> &'static str {
    match error {
        LucidityError::UnknownActionCode { .. } => "unknown_action_code",
        LucidityError::UnknownEncounterCategory { .. } => "unknown_encounter_category",
        LucidityError::OnCooldown { .. } => "on_cooldown",
        LucidityError::ActorNotFound(_) => "actor_not_found",
        LucidityError::Storage { .. } => "storage_error",
    }
}

/// Build a rejection reply from a gateway error.
fn rejection(error: &LucidityError) -> CommandReply {
    CommandReply::Rejected {
        code: error_code(error),
        message: error.to_string(),
    }
}

/// Publish a reply when the requester asked for one.
async fn respond(
    client: &async_nats::Client,
    reply_to: Option<async_nats::Subject>,
    reply: &CommandReply,
) {
    let Some(subject) = reply_to else {
        return;
    };
    match serde_json::to_vec(reply) {
        Ok(payload) => {
            if let Err(error) = client.publish(subject, payload.into()).await {
                warn!(%error, "command reply publish failed");
            }
        }
        Err(error) => {
            warn!(%error, "command reply serialization failed");
        }
    }
}

/// Subscribe to both command subjects and spawn their handler tasks.
///
/// # Errors
///
/// Returns [`EngineError::Nats`] if a subscription cannot be established.
pub async fn start<S: LucidityStore>(
    client: &async_nats::Client,
    gateway: Arc<EffectsGateway<S>>,
) -> Result<(), EngineError> {
    let mut encounters = client
        .subscribe(ENCOUNTER_SUBJECT)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("subscribe {ENCOUNTER_SUBJECT}: {e}"),
        })?;
    let mut recoveries = client
        .subscribe(RECOVERY_SUBJECT)
        .await
        .map_err(|e| EngineError::Nats {
            message: format!("subscribe {RECOVERY_SUBJECT}: {e}"),
        })?;

    {
        let gateway = Arc::clone(&gateway);
        let client = client.clone();
        tokio::spawn(async move {
            while let Some(msg) = encounters.next().await {
                let reply = match serde_json::from_slice::<EncounterCommand>(&msg.payload) {
                    Ok(cmd) => match gateway
                        .apply_encounter(cmd.actor_id, &cmd.archetype, &cmd.category, cmd.location_id)
                        .await
                    {
                        Ok(outcome) => CommandReply::Applied {
                            actor_id: cmd.actor_id,
                            score: outcome.adjustment.new_score,
                            tier: outcome.adjustment.new_tier,
                            delta: outcome.adjustment.delta,
                        },
                        Err(error) => {
                            warn!(actor_id = %cmd.actor_id, %error, "encounter command rejected");
                            rejection(&error)
                        }
                    },
                    Err(error) => CommandReply::Rejected {
                        code: "bad_payload",
                        message: error.to_string(),
                    },
                };
                respond(&client, msg.reply, &reply).await;
            }
        });
    }

    {
        let client = client.clone();
        tokio::spawn(async move {
            while let Some(msg) = recoveries.next().await {
                let reply = match serde_json::from_slice::<RecoveryCommand>(&msg.payload) {
                    Ok(cmd) => match gateway
                        .perform_recovery(cmd.actor_id, &cmd.action, cmd.location_id)
                        .await
                    {
                        Ok(outcome) => CommandReply::Applied {
                            actor_id: cmd.actor_id,
                            score: outcome.new_score,
                            tier: outcome.new_tier,
                            delta: outcome.delta,
                        },
                        Err(error) => {
                            warn!(actor_id = %cmd.actor_id, %error, "recovery command rejected");
                            rejection(&error)
                        }
                    },
                    Err(error) => CommandReply::Rejected {
                        code: "bad_payload",
                        message: error.to_string(),
                    },
                };
                respond(&client, msg.reply, &reply).await;
            }
        });
    }

    info!("command listener started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            error_code(&LucidityError::UnknownActionCode {
                code: String::from("juggling"),
            }),
            "unknown_action_code",
        );
        assert_eq!(
            error_code(&LucidityError::OnCooldown {
                action: String::from("commune"),
                remaining: TimeDelta::seconds(30),
            }),
            "on_cooldown",
        );
    }

    #[test]
    fn rejection_reply_serializes_with_tag() {
        let reply = rejection(&LucidityError::UnknownEncounterCategory {
            category: String::from("whimsical"),
        });
        let json = serde_json::to_value(&reply).ok();
        assert_eq!(
            json.as_ref()
                .and_then(|v| v.get("result"))
                .and_then(serde_json::Value::as_str),
            Some("rejected"),
        );
        assert_eq!(
            json.as_ref()
                .and_then(|v| v.get("code"))
                .and_then(serde_json::Value::as_str),
            Some("unknown_encounter_category"),
        );
    }

    #[test]
    fn commands_decode_with_optional_location() {
        let cmd: Result<RecoveryCommand, _> = serde_json::from_value(serde_json::json!({
            "actor_id": uuid::Uuid::nil(),
            "action": "commune",
        }));
        let cmd = cmd.ok();
        assert_eq!(cmd.as_ref().map(|c| c.action.as_str()), Some("commune"));
        assert_eq!(cmd.and_then(|c| c.location_id), None);
    }
}

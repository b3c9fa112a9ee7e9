//! NATS-backed notifier.
//!
//! The engine's write path hands events to a synchronous [`Notifier`];
//! this implementation forwards them over an unbounded channel to a
//! spawned publisher task, so the ledger write path never waits on the
//! wire. Publish and serialization failures are logged and dropped -- a
//! committed adjustment is never affected by transport trouble.

use tokio::sync::mpsc;
use tracing::warn;

use murkveil_lucidity::Notifier;
use murkveil_types::LucidityEvent;

/// Subject for state-change events.
const STATE_SUBJECT: &str = "murkveil.lucidity.state";

/// Subject for crisis events (catatonia, delirium, floor).
const CRISIS_SUBJECT: &str = "murkveil.lucidity.crisis";

/// Subject for hallucination events.
const HALLUCINATION_SUBJECT: &str = "murkveil.lucidity.hallucination";

/// Pick the subject for an event.
const fn subject_for(event: &LucidityEvent) -> &'static str {
    match event {
        LucidityEvent::StateChanged(_) => STATE_SUBJECT,
        LucidityEvent::Crisis(_) => CRISIS_SUBJECT,
        LucidityEvent::Hallucination(_) => HALLUCINATION_SUBJECT,
    }
}

/// [`Notifier`] that publishes events to NATS from a background task.
pub struct NatsNotifier {
    tx: mpsc::UnboundedSender<LucidityEvent>,
}

impl NatsNotifier {
    /// Spawn the publisher task over a connected client.
    pub fn spawn(client: async_nats::Client) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LucidityEvent>();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let subject = subject_for(&event);
                match serde_json::to_vec(&event) {
                    Ok(payload) => {
                        if let Err(error) = client.publish(subject, payload.into()).await {
                            warn!(%error, subject, "event publish failed, dropped");
                        }
                    }
                    Err(error) => {
                        warn!(%error, subject, "event serialization failed, dropped");
                    }
                }
            }
        });
        Self { tx }
    }

    /// Build a notifier over an existing sender (tests).
    #[cfg(test)]
    const fn from_sender(tx: mpsc::UnboundedSender<LucidityEvent>) -> Self {
        Self { tx }
    }
}

impl Notifier for NatsNotifier {
    fn notify(&self, event: LucidityEvent) {
        if self.tx.send(event).is_err() {
            warn!("publisher task gone, event dropped");
        }
    }
}

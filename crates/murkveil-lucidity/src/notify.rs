//! The notification transport seam.
//!
//! The session/notification transport that pushes state to clients is an
//! external collaborator; the engine only needs a way to hand events off.
//! Dispatch is fire-and-forget: implementations absorb their own failures
//! (log and drop), so a committed score mutation is never rolled back or
//! blocked by a downstream transport problem.

use murkveil_types::LucidityEvent;

/// Sink for events produced by the lucidity subsystem.
pub trait Notifier: Send + Sync {
    /// Hand an event to the transport. Must not block and must not fail
    /// visibly; implementations log their own errors.
    fn notify(&self, event: LucidityEvent);
}

/// A notifier that drops every event. For tests and headless tools.
pub struct NoOpNotifier;

impl Notifier for NoOpNotifier {
    fn notify(&self, _event: LucidityEvent) {}
}

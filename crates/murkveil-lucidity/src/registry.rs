//! The catatonia registry.
//!
//! Process-wide membership set of actors currently in the terminal tier,
//! implemented as a [`TransitionObserver`]. Membership lives only for the
//! process lifetime and is never persisted; the durable truth is the
//! `catatonia_entered_at` stamp on each record.
//!
//! The registry also owns failover dispatch: when an actor hits the
//! absolute floor, the injected [`FailoverHook`] is fired on a supervised
//! background task. The registry itself never touches storage.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use murkveil_types::ActorId;

use crate::error::FailoverError;
use crate::observer::TransitionObserver;

/// Emergency-relocation hook fired when an actor reaches the absolute floor.
///
/// The returned future is spawned and forgotten relative to the triggering
/// adjustment; errors are logged and swallowed.
pub trait FailoverHook: Send + Sync {
    /// Dispatch the relocation request for the given actor and score.
    fn dispatch(&self, actor_id: ActorId, score: i32)
    -> BoxFuture<'static, Result<(), FailoverError>>;
}

/// In-memory membership set of actors in the terminal tier.
pub struct CatatoniaRegistry {
    members: RwLock<BTreeMap<ActorId, DateTime<Utc>>>,
    failover: Option<Arc<dyn FailoverHook>>,
}

impl Default for CatatoniaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CatatoniaRegistry {
    /// Create an empty registry with no failover hook.
    pub const fn new() -> Self {
        Self {
            members: RwLock::new(BTreeMap::new()),
            failover: None,
        }
    }

    /// Create a registry with a failover hook for floor crossings.
    pub const fn with_failover(hook: Arc<dyn FailoverHook>) -> Self {
        Self {
            members: RwLock::new(BTreeMap::new()),
            failover: Some(hook),
        }
    }

    /// Whether the actor is currently registered as catatonic.
    pub fn contains(&self, actor_id: ActorId) -> bool {
        self.read().contains_key(&actor_id)
    }

    /// When the actor entered the terminal tier, if registered.
    pub fn entered_at(&self, actor_id: ActorId) -> Option<DateTime<Utc>> {
        self.read().get(&actor_id).copied()
    }

    /// Current member IDs, in sorted order.
    pub fn members(&self) -> Vec<ActorId> {
        self.read().keys().copied().collect()
    }

    /// Number of registered actors.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<ActorId, DateTime<Utc>>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<ActorId, DateTime<Utc>>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransitionObserver for CatatoniaRegistry {
    fn on_catatonia_entered(&self, actor_id: ActorId, entered_at: DateTime<Utc>) {
        self.write().insert(actor_id, entered_at);
        debug!(%actor_id, "actor registered catatonic");
    }

    fn on_catatonia_cleared(&self, actor_id: ActorId) {
        self.write().remove(&actor_id);
        debug!(%actor_id, "actor cleared from catatonia registry");
    }

    fn on_floor_reached(&self, actor_id: ActorId, score: i32) {
        let Some(hook) = self.failover.as_ref() else {
            debug!(%actor_id, score, "floor reached, no failover hook configured");
            return;
        };

        // Fire-and-forget: relocation must never block the write path that
        // triggered it. The completion hook logs failures and drops them.
        let future = hook.dispatch(actor_id, score);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(error) = future.await {
                        warn!(%actor_id, %error, "failover dispatch failed");
                    }
                });
            }
            Err(_) => {
                warn!(%actor_id, "no async runtime, failover dispatch dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct CountingHook {
        calls: Arc<AtomicU32>,
        fail: bool,
    }

    impl FailoverHook for CountingHook {
        fn dispatch(
            &self,
            _actor_id: ActorId,
            _score: i32,
        ) -> BoxFuture<'static, Result<(), FailoverError>> {
            let calls = Arc::clone(&self.calls);
            let fail = self.fail;
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(FailoverError {
                        message: String::from("relocation service down"),
                    })
                } else {
                    Ok(())
                }
            })
        }
    }

    #[test]
    fn membership_tracks_enter_and_clear() {
        let registry = CatatoniaRegistry::new();
        let actor = ActorId::new();
        assert!(registry.is_empty());

        registry.on_catatonia_entered(actor, Utc::now());
        assert!(registry.contains(actor));
        assert!(registry.entered_at(actor).is_some());
        assert_eq!(registry.len(), 1);

        registry.on_catatonia_cleared(actor);
        assert!(!registry.contains(actor));
        assert!(registry.is_empty());
    }

    #[test]
    fn clearing_unknown_actor_is_harmless() {
        let registry = CatatoniaRegistry::new();
        registry.on_catatonia_cleared(ActorId::new());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn floor_reached_dispatches_failover() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = CatatoniaRegistry::with_failover(Arc::new(CountingHook {
            calls: Arc::clone(&calls),
            fail: false,
        }));

        registry.on_floor_reached(ActorId::new(), -100);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failover_errors_are_swallowed() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = CatatoniaRegistry::with_failover(Arc::new(CountingHook {
            calls: Arc::clone(&calls),
            fail: true,
        }));

        // Must not panic or propagate anything.
        registry.on_floor_reached(ActorId::new(), -100);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn floor_reached_without_runtime_is_dropped() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = CatatoniaRegistry::with_failover(Arc::new(CountingHook {
            calls: Arc::clone(&calls),
            fail: false,
        }));

        // No tokio runtime here; the dispatch is logged and dropped.
        registry.on_floor_reached(ActorId::new(), -100);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

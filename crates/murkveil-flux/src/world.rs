//! Read-only world view consumed by the flux scheduler.
//!
//! World geography and presence are owned by external services; the
//! scheduler only needs to know where an eligible actor stands and who
//! stands with them. The live implementation queries the world service;
//! [`MemoryWorld`] backs tests.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use murkveil_types::{ActorId, LocationId, LocationKind};

/// An actor's surroundings at cadence time.
///
/// Also the wire shape the live world view receives from the world
/// service's locate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationProfile {
    /// The room the actor stands in.
    pub location_id: LocationId,
    /// Broad category of the room.
    pub kind: LocationKind,
    /// Plane of existence the room belongs to.
    pub plane: String,
    /// Region within the plane.
    pub region: String,
    /// Sub-region, when the region is subdivided.
    pub sub_region: Option<String>,
    /// Everyone currently in the room, including the subject.
    pub occupants: Vec<ActorId>,
}

/// Error resolving an actor's surroundings.
#[derive(Debug, thiserror::Error)]
#[error("world view unavailable: {message}")]
pub struct WorldViewError {
    /// Description of the failure.
    pub message: String,
}

/// Read-only geography and presence lookup.
pub trait WorldView: Send + Sync + 'static {
    /// Resolve an actor's surroundings. `None` means the actor is not
    /// currently placed in the world (limbo, logging in) and is skipped.
    fn locate(
        &self,
        actor_id: ActorId,
    ) -> impl Future<Output = Result<Option<LocationProfile>, WorldViewError>> + Send;
}

/// In-memory [`WorldView`] for tests.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    placements: Mutex<BTreeMap<ActorId, LocationProfile>>,
}

impl MemoryWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place (or move) an actor.
    pub fn place(&self, actor_id: ActorId, profile: LocationProfile) {
        self.placements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(actor_id, profile);
    }

    /// Remove an actor from the world.
    pub fn remove(&self, actor_id: ActorId) {
        self.placements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&actor_id);
    }
}

impl WorldView for MemoryWorld {
    async fn locate(
        &self,
        actor_id: ActorId,
    ) -> Result<Option<LocationProfile>, WorldViewError> {
        Ok(self
            .placements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&actor_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(location_id: LocationId) -> LocationProfile {
        LocationProfile {
            location_id,
            kind: LocationKind::Wilds,
            plane: String::from("mortal"),
            region: String::from("mirefen"),
            sub_region: None,
            occupants: Vec::new(),
        }
    }

    #[tokio::test]
    async fn locate_returns_placement() {
        let world = MemoryWorld::new();
        let actor = ActorId::new();
        let location = LocationId::new();
        world.place(actor, profile(location));

        let found = world.locate(actor).await;
        assert_eq!(
            found.ok().flatten().map(|p| p.location_id),
            Some(location),
        );
    }

    #[tokio::test]
    async fn unplaced_actor_is_none() {
        let world = MemoryWorld::new();
        let found = world.locate(ActorId::new()).await;
        assert_eq!(found.ok().flatten(), None);
    }
}

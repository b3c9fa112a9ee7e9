//! Error types for the lucidity core.
//!
//! All operations that can fail return typed errors rather than panicking.
//! Caller errors (unknown codes, live cooldowns) never mutate state; storage
//! errors abort the whole operation with no partial writes observable.

use chrono::TimeDelta;
use murkveil_types::ActorId;

/// Errors surfaced by the adjustment engine and the active effects gateway.
#[derive(Debug, thiserror::Error)]
pub enum LucidityError {
    /// A recovery ritual was requested with a code absent from the catalog.
    #[error("unknown recovery action code: {code}")]
    UnknownActionCode {
        /// The rejected action code.
        code: String,
    },

    /// An encounter was reported with a category absent from the catalog.
    ///
    /// The caller may retry with a fallback category.
    #[error("unknown encounter category: {category}")]
    UnknownEncounterCategory {
        /// The rejected category.
        category: String,
    },

    /// The recovery action is still on cooldown for this actor.
    #[error("action {action} on cooldown for {} more seconds", remaining.num_seconds())]
    OnCooldown {
        /// The gated action code.
        action: String,
        /// Time left until the cooldown expires.
        remaining: TimeDelta,
    },

    /// The actor has no record and creation was not permitted.
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// A storage operation failed; the operation was aborted with no
    /// partial writes. The caller may retry.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// Errors reported by [`LucidityStore`] implementations.
///
/// All variants are transient from the engine's perspective: the engine
/// retries `Conflict` internally a bounded number of times and surfaces the
/// rest as [`LucidityError::Storage`].
///
/// [`LucidityStore`]: crate::store::LucidityStore
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record's version no longer matched at save time; another writer
    /// got there first.
    #[error("concurrent modification of actor {actor_id}")]
    Conflict {
        /// The contended actor.
        actor_id: ActorId,
    },

    /// The storage call exceeded its bounded timeout.
    #[error("storage call timed out: {operation}")]
    Timeout {
        /// The operation that expired.
        operation: &'static str,
    },

    /// The backend rejected or failed the call.
    #[error("storage backend unavailable: {message}")]
    Unavailable {
        /// Description of the backend failure.
        message: String,
    },

    /// Stored data could not be decoded.
    #[error("corrupt stored data: {message}")]
    Corrupt {
        /// Description of the decode failure.
        message: String,
    },
}

/// Error returned by a failover hook dispatch.
///
/// Always logged and swallowed by the registry; never propagated into the
/// write path that triggered it.
#[derive(Debug, thiserror::Error)]
#[error("failover dispatch failed: {message}")]
pub struct FailoverError {
    /// Description of the dispatch failure.
    pub message: String,
}

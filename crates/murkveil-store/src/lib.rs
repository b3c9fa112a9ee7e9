//! Live storage for the Murkveil lucidity subsystem.
//!
//! `PostgreSQL` is the durable store (records, adjustment log, exposure,
//! activity); `Dragonfly` holds the cooldown hot state as TTL keys. The
//! [`LiveStore`] composes both behind the `LucidityStore` trait consumed
//! by the engine, gateway, and scheduler.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) cooldown keys
//! - [`error`] -- Shared error types ([`DbError`])
//! - [`live`] -- The composed [`LiveStore`]
//! - [`postgres`] -- `PostgreSQL` connection pool and migrations

pub mod dragonfly;
pub mod error;
pub mod live;
pub mod postgres;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use live::LiveStore;
pub use postgres::{PostgresConfig, PostgresPool};

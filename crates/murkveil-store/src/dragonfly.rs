//! `Dragonfly` (Redis-compatible) hot state: cooldown keys.
//!
//! Cooldowns are a natural fit for keys with a TTL: the value is the
//! expiry timestamp, the key's own TTL matches it, and absence means "not
//! on cooldown". Overwrites are last-write-wins, which is the documented
//! semantics for concurrent cooldown races.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `lucidity:{actor}:cd:{action}` | String (RFC 3339) | Cooldown expiry for an (actor, action) pair |

use chrono::{DateTime, Utc};
use fred::prelude::*;
use uuid::Uuid;

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

/// Build the cooldown key for an (actor, action) pair.
fn cooldown_key(actor_id: Uuid, action: &str) -> String {
    format!("lucidity:{actor_id}:cd:{action}")
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL follows the Redis URL scheme: `redis://host:port` or
    /// `redis://host:port/db`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed, or
    /// [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Set a cooldown expiry, with the key's TTL matching it.
    ///
    /// An expiry at or before `now` deletes the key instead -- a lapsed
    /// cooldown and an absent one are the same thing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_cooldown(
        &self,
        actor_id: Uuid,
        action: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let key = cooldown_key(actor_id, action);
        let ttl_ms = expires_at.signed_duration_since(now).num_milliseconds();
        if ttl_ms <= 0 {
            let _: u32 = self.client.del(&key).await?;
            return Ok(());
        }

        let _: () = self
            .client
            .set(
                &key,
                expires_at.to_rfc3339().as_str(),
                Some(Expiration::PX(ttl_ms)),
                None,
                false,
            )
            .await?;
        Ok(())
    }

    /// Read a cooldown expiry. `None` means not on cooldown (absent or
    /// already lapsed via TTL).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails, or
    /// [`DbError::Corrupt`] if the stored value is not a valid timestamp.
    pub async fn get_cooldown(
        &self,
        actor_id: Uuid,
        action: &str,
    ) -> Result<Option<DateTime<Utc>>, DbError> {
        let key = cooldown_key(actor_id, action);
        let value: Option<String> = self.client.get(&key).await?;
        value
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|e| {
                        DbError::Corrupt(format!("cooldown key {key} holds invalid timestamp: {e}"))
                    })
            })
            .transpose()
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

//! Cache layer: a per-owner, TTL-bounded index of entity names.
//!
//! The cache is a derived view of the authoritative store. It performs no
//! authorization and may be lost or rebuilt at any time. Expiry is enforced
//! by the backing store itself ([`RedisCache`] relies on `EXPIRE`,
//! [`InMemoryCache`] on a per-entry deadline).
//!
//! Neither backend can hold an empty set: removing the last member or
//! replacing the set with nothing leaves the entry absent, so an owner with
//! zero entities always reads as cold.

pub mod memory;
pub mod redis;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::OwnerId;
use crate::error::GatewayError;

pub use self::memory::InMemoryCache;
pub use self::redis::RedisCache;

/// Default lifetime of a warmed cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Ephemeral per-owner set of entity names.
#[async_trait]
pub trait CacheRepository: Send + Sync {
    /// Returns `true` if a live entry exists for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] on store failure.
    async fn exists(&self, owner: &OwnerId) -> Result<bool, GatewayError>;

    /// Returns the cached names for `owner`; empty when the entry is cold.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] on store failure.
    async fn members(&self, owner: &OwnerId) -> Result<HashSet<String>, GatewayError>;

    /// Replaces the whole set for `owner` and resets its expiry to `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] on store failure.
    async fn replace_all(
        &self,
        owner: &OwnerId,
        names: &[String],
        ttl: Duration,
    ) -> Result<(), GatewayError>;

    /// Adds one name without touching the expiry. Does nothing if the entry
    /// is absent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] on store failure.
    async fn add(&self, owner: &OwnerId, name: &str) -> Result<(), GatewayError>;

    /// Removes one name without touching the expiry.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] on store failure.
    async fn remove(&self, owner: &OwnerId, name: &str) -> Result<(), GatewayError>;

    /// Drops the entry for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] on store failure.
    async fn invalidate(&self, owner: &OwnerId) -> Result<(), GatewayError>;
}

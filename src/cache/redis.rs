//! Redis implementation of [`CacheRepository`].

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::CacheRepository;
use crate::domain::{EntityKind, OwnerId};
use crate::error::GatewayError;

/// Adds a member only when the set already exists, so an incremental write
/// can never create a set without an expiry.
const ADD_IF_PRESENT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('SADD', KEYS[1], ARGV[1])
end
return 0
";

/// Redis-backed cache storing one set per owner under `<prefix>:<owner>`.
///
/// Uses a [`ConnectionManager`], which is cheap to clone and multiplexes
/// requests over a single connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    prefix: &'static str,
    add_script: redis::Script,
}

impl RedisCache {
    /// Wraps an established connection for the given entity kind.
    #[must_use]
    pub fn new(conn: ConnectionManager, kind: EntityKind) -> Self {
        Self {
            conn,
            prefix: kind.cache_prefix(),
            add_script: redis::Script::new(ADD_IF_PRESENT),
        }
    }

    /// Connects to `url` and returns a cache for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Cache`] if the URL is malformed or the
    /// server is unreachable.
    pub async fn connect(url: &str, kind: EntityKind) -> Result<Self, GatewayError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(prefix = kind.cache_prefix(), "cache connected");
        Ok(Self::new(conn, kind))
    }

    fn key(&self, owner: &OwnerId) -> String {
        format!("{}:{}", self.prefix, owner)
    }
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheRepository for RedisCache {
    async fn exists(&self, owner: &OwnerId) -> Result<bool, GatewayError> {
        let mut conn = self.conn.clone();
        let present: bool = conn.exists(self.key(owner)).await?;
        Ok(present)
    }

    async fn members(&self, owner: &OwnerId) -> Result<HashSet<String>, GatewayError> {
        let mut conn = self.conn.clone();
        let names: HashSet<String> = conn.smembers(self.key(owner)).await?;
        Ok(names)
    }

    async fn replace_all(
        &self,
        owner: &OwnerId,
        names: &[String],
        ttl: Duration,
    ) -> Result<(), GatewayError> {
        let key = self.key(owner);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic().del(&key).ignore();
        if !names.is_empty() {
            let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
            pipe.sadd(&key, names).ignore().expire(&key, secs).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn add(&self, owner: &OwnerId, name: &str) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .add_script
            .key(self.key(owner))
            .arg(name)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, owner: &OwnerId, name: &str) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.srem(self.key(owner), name).await?;
        Ok(())
    }

    async fn invalidate(&self, owner: &OwnerId) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(self.key(owner)).await?;
        Ok(())
    }
}

//! In-memory implementation of [`CacheRepository`].

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::CacheRepository;
use crate::domain::OwnerId;
use crate::error::GatewayError;

#[derive(Debug)]
struct Entry {
    names: HashSet<String>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local cache with the same semantics as [`super::RedisCache`].
///
/// Expired entries are swept whenever an entry is (re)built. Deadlines use [`tokio::time::Instant`], so paused-clock tests can move
/// time forward with `tokio::time::advance`.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<OwnerId, Entry>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheRepository for InMemoryCache {
    async fn exists(&self, owner: &OwnerId) -> Result<bool, GatewayError> {
        let entries = self.entries.read().await;
        Ok(entries.get(owner).is_some_and(|e| e.is_live(Instant::now())))
    }

    async fn members(&self, owner: &OwnerId) -> Result<HashSet<String>, GatewayError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(owner)
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| e.names.clone())
            .unwrap_or_default())
    }

    async fn replace_all(
        &self,
        owner: &OwnerId,
        names: &[String],
        ttl: Duration,
    ) -> Result<(), GatewayError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));
        if names.is_empty() {
            entries.remove(owner);
            return Ok(());
        }
        entries.insert(
            owner.clone(),
            Entry {
                names: names.iter().cloned().collect(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn add(&self, owner: &OwnerId, name: &str) -> Result<(), GatewayError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let expired = match entries.get_mut(owner) {
            Some(entry) if entry.is_live(now) => {
                entry.names.insert(name.to_string());
                false
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(owner);
        }
        Ok(())
    }

    async fn remove(&self, owner: &OwnerId, name: &str) -> Result<(), GatewayError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let drop_entry = match entries.get_mut(owner) {
            Some(entry) if entry.is_live(now) => {
                entry.names.remove(name);
                entry.names.is_empty()
            }
            Some(_) => true,
            None => false,
        };
        if drop_entry {
            entries.remove(owner);
        }
        Ok(())
    }

    async fn invalidate(&self, owner: &OwnerId) -> Result<(), GatewayError> {
        self.entries.write().await.remove(owner);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    fn alice() -> OwnerId {
        let Ok(owner) = OwnerId::parse("alice") else {
            panic!("valid owner");
        };
        owner
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn cold_by_default() {
        let cache = InMemoryCache::new();
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
        assert!(matches!(cache.members(&alice()).await, Ok(ref m) if m.is_empty()));
    }

    #[tokio::test]
    async fn add_on_cold_entry_is_noop() {
        let cache = InMemoryCache::new();
        let _ = cache.add(&alice(), "nb1").await;
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
    }

    #[tokio::test]
    async fn incremental_edits_on_warm_entry() {
        let cache = InMemoryCache::new();
        let _ = cache
            .replace_all(&alice(), &names(&["nb1", "nb2"]), Duration::from_secs(60))
            .await;
        let _ = cache.add(&alice(), "nb3").await;
        let _ = cache.remove(&alice(), "nb1").await;

        let Ok(members) = cache.members(&alice()).await else {
            panic!("members failed");
        };
        let expected: HashSet<String> = names(&["nb2", "nb3"]).into_iter().collect();
        assert_eq!(members, expected);
    }

    #[tokio::test]
    async fn removing_last_member_drops_entry() {
        let cache = InMemoryCache::new();
        let _ = cache
            .replace_all(&alice(), &names(&["nb1"]), Duration::from_secs(60))
            .await;
        let _ = cache.remove(&alice(), "nb1").await;
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
    }

    #[tokio::test]
    async fn empty_replacement_stays_cold() {
        let cache = InMemoryCache::new();
        let _ = cache.replace_all(&alice(), &[], Duration::from_secs(60)).await;
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_at_deadline() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(7200);
        let _ = cache.replace_all(&alice(), &names(&["nb1"]), ttl).await;

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert!(matches!(cache.exists(&alice()).await, Ok(true)));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
        assert!(matches!(cache.members(&alice()).await, Ok(ref m) if m.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn incremental_add_keeps_deadline() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(100);
        let _ = cache.replace_all(&alice(), &names(&["nb1"]), ttl).await;

        tokio::time::advance(Duration::from_secs(60)).await;
        let _ = cache.add(&alice(), "nb2").await;

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn rebuilding_an_entry_evicts_expired_owners() {
        let Ok(bob) = OwnerId::parse("bob") else {
            panic!("valid owner");
        };
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);
        assert_ok!(cache.replace_all(&alice(), &names(&["nb1"]), ttl).await);

        tokio::time::advance(ttl).await;
        assert_ok!(cache.replace_all(&bob, &names(&["nb2"]), ttl).await);

        let entries = cache.entries.read().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&bob));
    }

    #[tokio::test]
    async fn invalidate_drops_entry() {
        let cache = InMemoryCache::new();
        let _ = cache
            .replace_all(&alice(), &names(&["nb1"]), Duration::from_secs(60))
            .await;
        let _ = cache.invalidate(&alice()).await;
        assert!(matches!(cache.exists(&alice()).await, Ok(false)));
    }
}

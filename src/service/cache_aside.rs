//! Cache-aside coordination between the authoritative store and the cache.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::CacheRepository;
use crate::domain::{DeleteOutcome, EntityKind, EntityName, EntityRecord, OwnerId};
use crate::error::GatewayError;
use crate::persistence::AuthoritativeRepository;

/// Decides read and write ordering between the two stores of one domain.
///
/// # Ordering
///
/// - Reads go to the cache first. On a miss the authoritative list is
///   returned right away and a detached task warms the cache.
/// - Writes always hit the authoritative store first and touch the cache
///   only after that succeeded, and only if the owner's entry is warm.
///
/// No lock is held across calls. A warm task may overwrite an incremental
/// edit made concurrently; the TTL bounds how long that staleness lasts.
pub struct CacheAside {
    kind: EntityKind,
    store: Arc<dyn AuthoritativeRepository>,
    cache: Arc<dyn CacheRepository>,
    ttl: Duration,
}

impl CacheAside {
    /// Creates a coordinator over the given stores.
    #[must_use]
    pub fn new(
        kind: EntityKind,
        store: Arc<dyn AuthoritativeRepository>,
        cache: Arc<dyn CacheRepository>,
        ttl: Duration,
    ) -> Self {
        Self {
            kind,
            store,
            cache,
            ttl,
        }
    }

    /// Returns the sorted entity names owned by `owner`.
    ///
    /// Cache failures are logged and the read falls back to the
    /// authoritative store.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] if the cache is cold and the
    /// authoritative store fails.
    pub async fn list(&self, owner: &OwnerId) -> Result<Vec<String>, GatewayError> {
        let (names, _warm) = self.read_through(owner).await?;
        Ok(names)
    }

    /// Read path. The second element is the spawned warm task on a miss;
    /// callers normally drop it.
    async fn read_through(
        &self,
        owner: &OwnerId,
    ) -> Result<(Vec<String>, Option<JoinHandle<()>>), GatewayError> {
        match self.cache.exists(owner).await {
            Ok(true) => match self.cache.members(owner).await {
                Ok(members) => {
                    let mut names: Vec<String> = members.into_iter().collect();
                    names.sort();
                    tracing::debug!(owner = %owner, kind = %self.kind, "cache hit");
                    return Ok((names, None));
                }
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "cache read failed, using store");
                }
            },
            Ok(false) => {
                tracing::debug!(owner = %owner, kind = %self.kind, "cache miss");
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "cache probe failed, using store");
            }
        }

        let mut names = self.store.list_by_owner(owner).await?;
        names.sort();
        names.dedup();

        let warm = self.spawn_warm(owner.clone(), names.clone());
        Ok((names, Some(warm)))
    }

    fn spawn_warm(&self, owner: OwnerId, names: Vec<String>) -> JoinHandle<()> {
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;
        tokio::spawn(async move {
            match cache.replace_all(&owner, &names, ttl).await {
                Ok(()) => {
                    tracing::debug!(owner = %owner, count = names.len(), "cache warmed");
                }
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "cache warm failed");
                }
            }
        })
    }

    /// Persists `record`, then adds it to the owner's cache entry if warm.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Conflict`] or [`GatewayError::Persistence`] from the
    ///   authoritative store; the cache is left untouched.
    /// - [`GatewayError::Cache`] if the cache update fails. The record is
    ///   already committed in that case.
    pub async fn create(&self, record: &EntityRecord) -> Result<(), GatewayError> {
        self.store.create(record).await?;

        if self.cache.exists(&record.owner).await? {
            self.cache.add(&record.owner, record.name.as_str()).await?;
        }
        tracing::info!(owner = %record.owner, name = %record.name, kind = %self.kind, "entity recorded");
        Ok(())
    }

    /// Checks ownership against the authoritative store, never the cache.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PermissionDenied`] if `owner` does not own
    /// `name`, or [`GatewayError::Persistence`] on store failure.
    pub async fn authorize(&self, owner: &OwnerId, name: &EntityName) -> Result<(), GatewayError> {
        if self.store.find_by_owner_and_key(owner, name).await? {
            Ok(())
        } else {
            Err(GatewayError::PermissionDenied(format!(
                "{owner} does not own {} {name}",
                self.kind
            )))
        }
    }

    /// Authorizes, deletes the record, then removes it from a warm cache.
    ///
    /// If a concurrent delete got to the record first, the owner's entry is
    /// invalidated instead so the next read rebuilds it from the store. The
    /// authoritative delete is not rolled back if the cache step fails.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::PermissionDenied`] without touching either store.
    /// - [`GatewayError::Persistence`] or [`GatewayError::Cache`] on store
    ///   failure.
    pub async fn delete(
        &self,
        owner: &OwnerId,
        name: &EntityName,
    ) -> Result<DeleteOutcome, GatewayError> {
        self.authorize(owner, name).await?;

        let outcome = self.store.delete(name).await?;
        match outcome {
            DeleteOutcome::Deleted => {
                if self.cache.exists(owner).await? {
                    self.cache.remove(owner, name.as_str()).await?;
                }
            }
            DeleteOutcome::NotFound => self.cache.invalidate(owner).await?,
        }
        tracing::info!(owner = %owner, name = %name, kind = %self.kind, ?outcome, "entity removed");
        Ok(outcome)
    }
}

impl fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAside")
            .field("kind", &self.kind)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::cache::InMemoryCache;
    use crate::persistence::InMemoryStore;

    const TTL: Duration = Duration::from_secs(7200);

    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl CacheRepository for BrokenCache {
        async fn exists(&self, _: &OwnerId) -> Result<bool, GatewayError> {
            Err(GatewayError::Cache("connection refused".into()))
        }
        async fn members(&self, _: &OwnerId) -> Result<HashSet<String>, GatewayError> {
            Err(GatewayError::Cache("connection refused".into()))
        }
        async fn replace_all(&self, _: &OwnerId, _: &[String], _: Duration) -> Result<(), GatewayError> {
            Err(GatewayError::Cache("connection refused".into()))
        }
        async fn add(&self, _: &OwnerId, _: &str) -> Result<(), GatewayError> {
            Err(GatewayError::Cache("connection refused".into()))
        }
        async fn remove(&self, _: &OwnerId, _: &str) -> Result<(), GatewayError> {
            Err(GatewayError::Cache("connection refused".into()))
        }
        async fn invalidate(&self, _: &OwnerId) -> Result<(), GatewayError> {
            Err(GatewayError::Cache("connection refused".into()))
        }
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        cache: Arc<InMemoryCache>,
        coordinator: CacheAside,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new(EntityKind::Notebook));
        let cache = Arc::new(InMemoryCache::new());
        let coordinator = CacheAside::new(
            EntityKind::Notebook,
            Arc::clone(&store) as Arc<dyn AuthoritativeRepository>,
            Arc::clone(&cache) as Arc<dyn CacheRepository>,
            TTL,
        );
        Fixture {
            store,
            cache,
            coordinator,
        }
    }

    fn owner(raw: &str) -> OwnerId {
        let Ok(owner) = OwnerId::parse(raw) else {
            panic!("valid owner");
        };
        owner
    }

    fn name(raw: &str) -> EntityName {
        let Ok(name) = EntityName::parse(raw) else {
            panic!("valid name");
        };
        name
    }

    fn record(by: &str, raw: &str) -> EntityRecord {
        EntityRecord::new(EntityKind::Notebook, name(raw), owner(by))
    }

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn set(raw: &[&str]) -> HashSet<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    async fn seed(store: &InMemoryStore, by: &str, names: &[&str]) {
        for raw in names {
            let Ok(()) = store.create(&record(by, raw)).await else {
                panic!("seeding {raw} failed");
            };
        }
    }

    async fn warm(f: &Fixture, by: &str) -> Vec<String> {
        let Ok((names, task)) = f.coordinator.read_through(&owner(by)).await else {
            panic!("read failed");
        };
        if let Some(task) = task {
            let Ok(()) = task.await else {
                panic!("warm task panicked");
            };
        }
        names
    }

    #[tokio::test]
    async fn cold_read_returns_store_contents_and_warms() {
        let f = fixture();
        seed(&f.store, "alice", &["nb2", "nb1"]).await;

        let first = warm(&f, "alice").await;
        assert_eq!(first, strings(&["nb1", "nb2"]));
        assert!(matches!(f.cache.exists(&owner("alice")).await, Ok(true)));

        let Ok((second, task)) = f.coordinator.read_through(&owner("alice")).await else {
            panic!("read failed");
        };
        assert!(task.is_none());
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn writes_update_warm_entry_incrementally() {
        let f = fixture();
        seed(&f.store, "alice", &["nb1"]).await;
        let _ = warm(&f, "alice").await;

        assert_ok!(f.coordinator.create(&record("alice", "nb2")).await);
        let Ok(members) = f.cache.members(&owner("alice")).await else {
            panic!("members failed");
        };
        assert_eq!(members, set(&["nb1", "nb2"]));

        let deleted = f.coordinator.delete(&owner("alice"), &name("nb1")).await;
        assert!(matches!(deleted, Ok(DeleteOutcome::Deleted)));
        let Ok(members) = f.cache.members(&owner("alice")).await else {
            panic!("members failed");
        };
        assert_eq!(members, set(&["nb2"]));
    }

    #[tokio::test]
    async fn create_on_cold_cache_leaves_it_cold() {
        let f = fixture();
        assert_ok!(f.coordinator.create(&record("alice", "nb1")).await);
        assert!(matches!(f.cache.exists(&owner("alice")).await, Ok(false)));
    }

    #[tokio::test]
    async fn ownership_is_checked_against_store_not_cache() {
        let f = fixture();
        seed(&f.store, "bob", &["nb1"]).await;
        let _ = f
            .cache
            .replace_all(&owner("alice"), &strings(&["nb1"]), TTL)
            .await;

        let result = f.coordinator.delete(&owner("alice"), &name("nb1")).await;
        assert!(matches!(result, Err(GatewayError::PermissionDenied(_))));

        let still_owned = f.store.find_by_owner_and_key(&owner("bob"), &name("nb1")).await;
        assert!(matches!(still_owned, Ok(true)));
        let Ok(members) = f.cache.members(&owner("alice")).await else {
            panic!("members failed");
        };
        assert!(members.contains("nb1"));
    }

    #[tokio::test]
    async fn duplicate_names_conflict_without_cache_changes() {
        let f = fixture();
        assert!(f.coordinator.create(&record("alice", "nb1")).await.is_ok());
        let _ = f.cache.replace_all(&owner("bob"), &strings(&["other"]), TTL).await;

        let second = f.coordinator.create(&record("bob", "nb1")).await;
        assert!(matches!(second, Err(GatewayError::Conflict(_))));
        let Ok(members) = f.cache.members(&owner("bob")).await else {
            panic!("members failed");
        };
        assert_eq!(members, set(&["other"]));
    }

    #[tokio::test]
    async fn alice_scenario() {
        let f = fixture();
        seed(&f.store, "alice", &["nb1", "nb2"]).await;

        assert_eq!(warm(&f, "alice").await, strings(&["nb1", "nb2"]));
        assert!(f.coordinator.create(&record("alice", "nb3")).await.is_ok());

        let Ok(listed) = f.coordinator.list(&owner("alice")).await else {
            panic!("list failed");
        };
        assert_eq!(listed, strings(&["nb1", "nb2", "nb3"]));
    }

    #[tokio::test]
    async fn read_path_swallows_cache_failures() {
        let store = Arc::new(InMemoryStore::new(EntityKind::Notebook));
        seed(&store, "alice", &["nb1"]).await;
        let coordinator = CacheAside::new(
            EntityKind::Notebook,
            Arc::clone(&store) as Arc<dyn AuthoritativeRepository>,
            Arc::new(BrokenCache),
            TTL,
        );

        let Ok((names, task)) = coordinator.read_through(&owner("alice")).await else {
            panic!("read must not fail on cache errors");
        };
        assert_eq!(names, strings(&["nb1"]));
        if let Some(task) = task {
            assert!(task.await.is_ok());
        }
    }

    #[tokio::test]
    async fn write_path_surfaces_cache_failures_after_commit() {
        let store = Arc::new(InMemoryStore::new(EntityKind::Notebook));
        let coordinator = CacheAside::new(
            EntityKind::Notebook,
            Arc::clone(&store) as Arc<dyn AuthoritativeRepository>,
            Arc::new(BrokenCache),
            TTL,
        );

        let result = coordinator.create(&record("alice", "nb1")).await;
        assert!(matches!(result, Err(GatewayError::Cache(_))));
        let committed = store.find_by_owner_and_key(&owner("alice"), &name("nb1")).await;
        assert!(matches!(committed, Ok(true)));
    }

    /// Store whose record disappears between the ownership check and the
    /// delete, as when two deletes race.
    #[derive(Debug)]
    struct RacedStore;

    #[async_trait]
    impl AuthoritativeRepository for RacedStore {
        async fn create(&self, _: &EntityRecord) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn delete(&self, _: &EntityName) -> Result<DeleteOutcome, GatewayError> {
            Ok(DeleteOutcome::NotFound)
        }
        async fn find_by_owner_and_key(&self, _: &OwnerId, _: &EntityName) -> Result<bool, GatewayError> {
            Ok(true)
        }
        async fn list_by_owner(&self, _: &OwnerId) -> Result<Vec<String>, GatewayError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn delete_surfaces_cache_failure_after_commit() {
        let store = Arc::new(InMemoryStore::new(EntityKind::Notebook));
        seed(&store, "alice", &["nb1"]).await;
        let coordinator = CacheAside::new(
            EntityKind::Notebook,
            Arc::clone(&store) as Arc<dyn AuthoritativeRepository>,
            Arc::new(BrokenCache),
            TTL,
        );

        let result = coordinator.delete(&owner("alice"), &name("nb1")).await;
        assert!(matches!(result, Err(GatewayError::Cache(_))));
        let still_there = store.find_by_owner_and_key(&owner("alice"), &name("nb1")).await;
        assert!(!assert_ok!(still_there));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn lost_delete_race_invalidates_owner_entry() {
        let cache = Arc::new(InMemoryCache::new());
        let _ = cache
            .replace_all(&owner("alice"), &strings(&["nb1", "nb2"]), TTL)
            .await;
        let coordinator = CacheAside::new(
            EntityKind::Notebook,
            Arc::new(RacedStore),
            Arc::clone(&cache) as Arc<dyn CacheRepository>,
            TTL,
        );

        let outcome = coordinator.delete(&owner("alice"), &name("nb1")).await;
        assert!(matches!(outcome, Ok(DeleteOutcome::NotFound)));
        assert!(matches!(cache.exists(&owner("alice")).await, Ok(false)));
    }

    #[tokio::test]
    async fn delete_of_unknown_entity_is_denied() {
        let f = fixture();
        let result = f.coordinator.delete(&owner("alice"), &name("ghost")).await;
        assert_err!(&result);
        assert!(matches!(result, Err(GatewayError::PermissionDenied(_))));
    }
}

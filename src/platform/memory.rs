//! In-memory stand-in for the orchestration platform.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PlatformClient, PlatformError, ResourceSpec};
use crate::domain::{EntityKind, EntityName};

type ResourceKey = (EntityKind, String, String);

/// Process-local platform keeping resources in a sorted map.
///
/// [`InMemoryPlatform::set_available`] simulates an outage: while
/// unavailable, every call fails with [`PlatformError::Unavailable`].
#[derive(Debug)]
pub struct InMemoryPlatform {
    resources: RwLock<BTreeMap<ResourceKey, String>>,
    available: AtomicBool,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self {
            resources: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryPlatform {
    /// Creates an empty, available platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PlatformError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PlatformError::Unavailable("platform offline".to_string()))
        }
    }
}

#[async_trait]
impl PlatformClient for InMemoryPlatform {
    async fn create_resource(&self, spec: &ResourceSpec) -> Result<String, PlatformError> {
        self.check()?;
        let key = (spec.kind, spec.namespace.clone(), spec.name.to_string());
        let mut resources = self.resources.write().await;
        if resources.contains_key(&key) {
            return Err(PlatformError::AlreadyExists(spec.name.to_string()));
        }
        let id = uuid::Uuid::new_v4().to_string();
        resources.insert(key, id.clone());
        tracing::debug!(kind = %spec.kind, name = %spec.name, owner = %spec.owner, "resource provisioned");
        Ok(id)
    }

    async fn delete_resource(
        &self,
        kind: EntityKind,
        namespace: &str,
        name: &EntityName,
    ) -> Result<(), PlatformError> {
        self.check()?;
        let key = (kind, namespace.to_string(), name.to_string());
        match self.resources.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(PlatformError::NotFound(name.to_string())),
        }
    }

    async fn list_resources(
        &self,
        kind: EntityKind,
        namespace: &str,
    ) -> Result<Vec<String>, PlatformError> {
        self.check()?;
        let resources = self.resources.read().await;
        Ok(resources
            .keys()
            .filter(|(k, ns, _)| *k == kind && ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect())
    }
}

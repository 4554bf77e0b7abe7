//! Entity service: the operations exposed by one domain.

use std::fmt;
use std::sync::Arc;

use crate::domain::{
    Attachment, DeleteOutcome, EntityEvent, EntityKind, EntityName, EntityRecord, OwnerId,
    RoutingKey,
};
use crate::error::GatewayError;
use crate::messaging::MessageBus;
use crate::persistence::AttachmentLedger;
use crate::platform::{PlatformClient, PlatformError, ResourceSpec};

use super::CacheAside;

/// Deployment settings of a domain service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Platform namespace resources are created in.
    pub namespace: String,
    /// Public base URL for notebook access links.
    pub url_base: String,
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntity {
    /// Entity name.
    pub name: EntityName,
    /// Entity kind.
    pub kind: EntityKind,
    /// Platform identifier of the provisioned resource.
    pub platform_id: String,
    /// Access URL; only notebooks have one.
    pub url: Option<String>,
}

/// Orchestrates one domain: platform, stores, ledger and event bus.
///
/// Every mutation follows the same order: platform, authoritative store,
/// cache, attachments, event. A failure stops the sequence where it
/// happened; steps already committed are not unwound, except that a
/// resource provisioned for a create whose record could not be written is
/// deleted again on a best-effort basis.
pub struct EntityService {
    kind: EntityKind,
    coordinator: CacheAside,
    ledger: Arc<dyn AttachmentLedger>,
    platform: Arc<dyn PlatformClient>,
    bus: Arc<dyn MessageBus>,
    settings: ServiceSettings,
}

impl EntityService {
    /// Creates a new `EntityService`.
    #[must_use]
    pub fn new(
        kind: EntityKind,
        coordinator: CacheAside,
        ledger: Arc<dyn AttachmentLedger>,
        platform: Arc<dyn PlatformClient>,
        bus: Arc<dyn MessageBus>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            kind,
            coordinator,
            ledger,
            platform,
            bus,
            settings,
        }
    }

    /// Returns the domain this service owns.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Lists the entity names owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] if the authoritative store
    /// fails on a cold read.
    pub async fn list_entities(&self, owner: &OwnerId) -> Result<Vec<String>, GatewayError> {
        self.coordinator.list(owner).await
    }

    /// Provisions and records a new entity, optionally attached to a peer.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Conflict`] if the name is taken on the platform or
    ///   in the authoritative store.
    /// - [`GatewayError::Platform`], [`GatewayError::Persistence`],
    ///   [`GatewayError::Cache`] or [`GatewayError::Broker`] on collaborator
    ///   failure. Cache and broker failures happen after the record is
    ///   committed.
    pub async fn create_entity(
        &self,
        owner: &OwnerId,
        name: EntityName,
        attach_to: Option<EntityName>,
    ) -> Result<CreatedEntity, GatewayError> {
        let spec = ResourceSpec {
            kind: self.kind,
            name: name.clone(),
            namespace: self.settings.namespace.clone(),
            owner: owner.clone(),
        };
        let platform_id = self.platform.create_resource(&spec).await?;

        let record = EntityRecord::new(self.kind, name.clone(), owner.clone());
        if let Err(e) = self.coordinator.create(&record).await {
            if !matches!(e, GatewayError::Cache(_)) {
                self.release_orphan(&name).await;
            }
            return Err(e);
        }

        if let Some(peer) = attach_to {
            // The peer lives in the other domain's store; the link is recorded as given.
            tracing::debug!(kind = %self.kind, name = %name, peer = %peer, "recording unverified attachment");
            let attachment = Attachment::between(self.kind, name.clone(), peer, owner.clone());
            self.ledger.attach(&attachment).await?;
        }

        self.publish(RoutingKey::created(self.kind), &name).await?;

        Ok(CreatedEntity {
            url: self.access_url(&name),
            name,
            kind: self.kind,
            platform_id,
        })
    }

    /// Tears down an entity owned by `owner`.
    ///
    /// Ownership is checked before the platform is touched.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::PermissionDenied`] if `owner` does not own `name`.
    /// - [`GatewayError::NotFound`] if a concurrent delete removed the
    ///   record first.
    /// - Collaborator failures as internal errors.
    pub async fn delete_entity(&self, owner: &OwnerId, name: &EntityName) -> Result<(), GatewayError> {
        self.coordinator.authorize(owner, name).await?;

        match self
            .platform
            .delete_resource(self.kind, &self.settings.namespace, name)
            .await
        {
            Ok(()) => {}
            Err(PlatformError::NotFound(_)) => {
                tracing::warn!(kind = %self.kind, name = %name, "resource already gone from platform");
            }
            Err(e) => return Err(e.into()),
        }

        if self.coordinator.delete(owner, name).await? == DeleteOutcome::NotFound {
            return Err(GatewayError::NotFound(format!("{} {name}", self.kind)));
        }

        let released = match self.kind {
            EntityKind::Notebook => self.ledger.detach_notebook(name).await?,
            EntityKind::Volume => self.ledger.detach_volume(name).await?,
        };
        tracing::debug!(kind = %self.kind, name = %name, released, "own attachments released");

        self.publish(RoutingKey::deleted(self.kind), name).await
    }

    /// Lists the resources of this kind present on the platform.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Platform`] if the platform is unavailable.
    pub async fn list_platform_resources(&self) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .platform
            .list_resources(self.kind, &self.settings.namespace)
            .await?)
    }

    async fn publish(&self, key: RoutingKey, name: &EntityName) -> Result<(), GatewayError> {
        let body = EntityEvent::new(key, name.clone()).encode()?;
        self.bus.publish(&key, &body).await
    }

    async fn release_orphan(&self, name: &EntityName) {
        if let Err(e) = self
            .platform
            .delete_resource(self.kind, &self.settings.namespace, name)
            .await
        {
            tracing::warn!(kind = %self.kind, name = %name, error = %e, "orphaned resource left on platform");
        }
    }

    fn access_url(&self, name: &EntityName) -> Option<String> {
        match self.kind {
            EntityKind::Notebook => Some(format!(
                "{}/notebook/{}/{}/",
                self.settings.url_base.trim_end_matches('/'),
                self.settings.namespace,
                name
            )),
            EntityKind::Volume => None,
        }
    }
}

impl fmt::Debug for EntityService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityService")
            .field("kind", &self.kind)
            .field("coordinator", &self.coordinator)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

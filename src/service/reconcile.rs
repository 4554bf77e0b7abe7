//! Handlers for deletion events coming from the peer domain.
//!
//! A service only ever listens to `<PEER>.DELETE`. On delivery it clears the
//! attachment rows that reference the deleted peer entity. The peer's
//! workload itself is never touched from here.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{EntityEvent, EntityKind, RoutingKey};
use crate::error::GatewayError;
use crate::messaging::{EventHandler, Handlers};
use crate::persistence::AttachmentLedger;

/// Clears local attachments when the peer domain deletes an entity.
///
/// Detaching is delete-if-exists, so redelivery and reordering converge to
/// the same state.
pub struct PeerDeletionHandler {
    peer: EntityKind,
    ledger: Arc<dyn AttachmentLedger>,
}

impl PeerDeletionHandler {
    /// Creates a handler for deletions of `peer` entities.
    #[must_use]
    pub fn new(peer: EntityKind, ledger: Arc<dyn AttachmentLedger>) -> Self {
        Self { peer, ledger }
    }

    /// Routing key this handler must be bound to.
    #[must_use]
    pub const fn routing_key(&self) -> RoutingKey {
        RoutingKey::deleted(self.peer)
    }
}

impl fmt::Debug for PeerDeletionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerDeletionHandler")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventHandler for PeerDeletionHandler {
    async fn handle(&self, body: &[u8]) -> Result<(), GatewayError> {
        let event = EntityEvent::decode(self.routing_key(), body)?;
        let removed = match self.peer {
            EntityKind::Volume => self.ledger.detach_volume(&event.name).await?,
            EntityKind::Notebook => self.ledger.detach_notebook(&event.name).await?,
        };
        tracing::info!(peer = %self.peer, name = %event.name, removed, "attachments released");
        Ok(())
    }

    fn name(&self) -> &'static str {
        match self.peer {
            EntityKind::Volume => "volume-deleted",
            EntityKind::Notebook => "notebook-deleted",
        }
    }
}

/// Builds the dispatch table for a service of `kind`.
#[must_use]
pub fn handlers_for(kind: EntityKind, ledger: Arc<dyn AttachmentLedger>) -> Handlers {
    let handler = PeerDeletionHandler::new(kind.peer(), ledger);
    Handlers::new().register(handler.routing_key(), Arc::new(handler))
}

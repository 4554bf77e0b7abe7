//! In-memory authoritative store.
//!
//! [`InMemoryStore`] keeps records in a `HashMap` behind a
//! [`tokio::sync::RwLock`]. It is injected like any other store (there is
//! no process-wide instance) and mirrors the PostgreSQL semantics: unique
//! names per kind, idempotent deletes, idempotent attachment writes.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AttachmentLedger, AuthoritativeRepository};
use crate::domain::{Attachment, DeleteOutcome, EntityKind, EntityName, EntityRecord, OwnerId};
use crate::error::GatewayError;

/// Process-local authoritative store for one entity kind.
///
/// # Concurrency
///
/// - Reads run concurrently.
/// - Each mutation holds the write lock for a single map operation, which
///   gives the same per-key atomicity the database provides.
#[derive(Debug)]
pub struct InMemoryStore {
    kind: EntityKind,
    records: RwLock<HashMap<EntityName, EntityRecord>>,
    attachments: RwLock<HashSet<Attachment>>,
}

impl InMemoryStore {
    /// Creates an empty store for `kind`.
    #[must_use]
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            records: RwLock::new(HashMap::new()),
            attachments: RwLock::new(HashSet::new()),
        }
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuthoritativeRepository for InMemoryStore {
    async fn create(&self, record: &EntityRecord) -> Result<(), GatewayError> {
        let mut map = self.records.write().await;
        if map.contains_key(&record.name) {
            return Err(GatewayError::Conflict(format!(
                "{} {} already exists",
                self.kind, record.name
            )));
        }
        map.insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, name: &EntityName) -> Result<DeleteOutcome, GatewayError> {
        let removed = self.records.write().await.remove(name);
        Ok(if removed.is_some() {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn find_by_owner_and_key(
        &self,
        owner: &OwnerId,
        name: &EntityName,
    ) -> Result<bool, GatewayError> {
        let map = self.records.read().await;
        Ok(map.get(name).is_some_and(|record| &record.owner == owner))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<String>, GatewayError> {
        let map = self.records.read().await;
        let mut names: Vec<String> = map
            .values()
            .filter(|record| &record.owner == owner)
            .map(|record| record.name.to_string())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl AttachmentLedger for InMemoryStore {
    async fn attach(&self, attachment: &Attachment) -> Result<(), GatewayError> {
        self.attachments.write().await.insert(attachment.clone());
        Ok(())
    }

    async fn detach_notebook(&self, notebook: &EntityName) -> Result<u64, GatewayError> {
        let mut set = self.attachments.write().await;
        let before = set.len();
        set.retain(|a| &a.notebook != notebook);
        Ok((before - set.len()) as u64)
    }

    async fn detach_volume(&self, volume: &EntityName) -> Result<u64, GatewayError> {
        let mut set = self.attachments.write().await;
        let before = set.len();
        set.retain(|a| &a.volume != volume);
        Ok((before - set.len()) as u64)
    }

    async fn attachments_for_notebook(
        &self,
        notebook: &EntityName,
    ) -> Result<Vec<Attachment>, GatewayError> {
        let set = self.attachments.read().await;
        let mut found: Vec<Attachment> = set
            .iter()
            .filter(|a| &a.notebook == notebook)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.volume.cmp(&b.volume));
        Ok(found)
    }

    async fn attachments_for_volume(
        &self,
        volume: &EntityName,
    ) -> Result<Vec<Attachment>, GatewayError> {
        let set = self.attachments.read().await;
        let mut found: Vec<Attachment> = set
            .iter()
            .filter(|a| &a.volume == volume)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.notebook.cmp(&b.notebook));
        Ok(found)
    }
}

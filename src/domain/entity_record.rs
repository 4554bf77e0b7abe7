//! Authoritative records and attachment bookkeeping.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EntityKind, EntityName, OwnerId};

/// Durable record of an entity in the authoritative store.
///
/// Records are write-once and delete-once: created after the platform
/// resource is provisioned, removed when it is torn down, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    /// Globally unique name within the kind's collection.
    pub name: EntityName,
    /// Owning principal.
    pub owner: OwnerId,
    /// Domain the record belongs to.
    pub kind: EntityKind,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl EntityRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(kind: EntityKind, name: EntityName, owner: OwnerId) -> Self {
        Self {
            name,
            owner,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Link between a notebook and the volume mounted as its workspace.
///
/// Each service keeps its own copy of the links it learned about; the
/// cross-domain handlers clear them when the peer reports a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Attachment {
    /// Notebook side of the link.
    pub notebook: EntityName,
    /// Volume side of the link.
    pub volume: EntityName,
    /// Principal that created the link.
    pub owner: OwnerId,
}

impl Attachment {
    /// Builds an attachment from the point of view of `kind`: `name` is the
    /// local entity and `peer` the entity of the other domain.
    #[must_use]
    pub fn between(kind: EntityKind, name: EntityName, peer: EntityName, owner: OwnerId) -> Self {
        match kind {
            EntityKind::Notebook => Self {
                notebook: name,
                volume: peer,
                owner,
            },
            EntityKind::Volume => Self {
                notebook: peer,
                volume: name,
                owner,
            },
        }
    }
}

/// Result of an authoritative delete.
///
/// A missing key is not an error for the store, but callers get to tell the
/// two cases apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record existed and was removed.
    Deleted,
    /// No record with that key existed.
    NotFound,
}

impl DeleteOutcome {
    /// Builds the outcome from an affected-row count.
    #[must_use]
    pub const fn from_rows(rows: u64) -> Self {
        if rows == 0 {
            Self::NotFound
        } else {
            Self::Deleted
        }
    }
}

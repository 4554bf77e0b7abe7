//! Persistence layer: the authoritative store of entity records.
//!
//! Provides the [`AuthoritativeRepository`] trait for durable ownership and
//! existence records, and the [`AttachmentLedger`] trait for the
//! notebook/volume links the cross-domain handlers reconcile. The
//! production implementation uses `sqlx::PgPool`; [`InMemoryStore`] backs
//! tests and single-process development setups.
//!
//! Every operation touches a single record, so no transaction spans more
//! than one statement.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Attachment, DeleteOutcome, EntityName, EntityRecord, OwnerId};
use crate::error::GatewayError;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Source of truth for which entities exist and who owns them.
///
/// An implementation is bound to one [`crate::domain::EntityKind`] and only
/// ever touches that kind's collection.
#[async_trait]
pub trait AuthoritativeRepository: Send + Sync {
    /// Durably inserts a record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Conflict`] if a record with the same name
    /// exists (for any owner), or [`GatewayError::Persistence`] on store
    /// failure.
    async fn create(&self, record: &EntityRecord) -> Result<(), GatewayError>;

    /// Removes the record with the given name, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure. A missing
    /// record is reported as [`DeleteOutcome::NotFound`], not as an error.
    async fn delete(&self, name: &EntityName) -> Result<DeleteOutcome, GatewayError>;

    /// Returns `true` if `owner` owns the record named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn find_by_owner_and_key(
        &self,
        owner: &OwnerId,
        name: &EntityName,
    ) -> Result<bool, GatewayError>;

    /// Returns the names of every record owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<String>, GatewayError>;
}

/// Durable notebook/volume links.
///
/// All mutations are idempotent so that redelivered events converge to the
/// same state.
#[async_trait]
pub trait AttachmentLedger: Send + Sync {
    /// Records a link; recording an existing link is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn attach(&self, attachment: &Attachment) -> Result<(), GatewayError>;

    /// Removes every link of the notebook and returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn detach_notebook(&self, notebook: &EntityName) -> Result<u64, GatewayError>;

    /// Removes every link of the volume and returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn detach_volume(&self, volume: &EntityName) -> Result<u64, GatewayError>;

    /// Returns the links of a notebook.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn attachments_for_notebook(
        &self,
        notebook: &EntityName,
    ) -> Result<Vec<Attachment>, GatewayError>;

    /// Returns the links of a volume.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on store failure.
    async fn attachments_for_volume(
        &self,
        volume: &EntityName,
    ) -> Result<Vec<Attachment>, GatewayError>;
}

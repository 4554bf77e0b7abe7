//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::AttachmentRow;
use super::{AttachmentLedger, AuthoritativeRepository};
use crate::domain::{Attachment, DeleteOutcome, EntityKind, EntityName, EntityRecord, OwnerId};
use crate::error::GatewayError;

/// PostgreSQL-backed authoritative store using `sqlx::PgPool`.
///
/// Bound to one [`EntityKind`]: queries address that kind's table
/// (`notebooks` or `volumes`). Name uniqueness is enforced by the table's
/// primary key.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    kind: EntityKind,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool, kind: EntityKind) -> Self {
        Self { pool, kind }
    }

    /// Opens a connection pool and applies the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] if the database is unreachable
    /// or a migration fails.
    pub async fn connect(
        url: &str,
        kind: EntityKind,
        max_connections: u32,
        min_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::Persistence(format!("migration failed: {e}")))?;

        tracing::info!(table = kind.table(), "authoritative store ready");
        Ok(Self::new(pool, kind))
    }
}

#[async_trait]
impl AuthoritativeRepository for PostgresStore {
    async fn create(&self, record: &EntityRecord) -> Result<(), GatewayError> {
        let sql = format!(
            "INSERT INTO {} (entity_name, owner, created_at) VALUES ($1, $2, $3)",
            self.kind.table()
        );
        sqlx::query(&sql)
            .bind(record.name.as_str())
            .bind(record.owner.as_str())
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    GatewayError::Conflict(format!("{} {} already exists", self.kind, record.name))
                }
                other => GatewayError::from(other),
            })?;
        Ok(())
    }

    async fn delete(&self, name: &EntityName) -> Result<DeleteOutcome, GatewayError> {
        let sql = format!("DELETE FROM {} WHERE entity_name = $1", self.kind.table());
        let result = sqlx::query(&sql)
            .bind(name.as_str())
            .execute(&self.pool)
            .await?;
        Ok(DeleteOutcome::from_rows(result.rows_affected()))
    }

    async fn find_by_owner_and_key(
        &self,
        owner: &OwnerId,
        name: &EntityName,
    ) -> Result<bool, GatewayError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE entity_name = $1 AND owner = $2)",
            self.kind.table()
        );
        let owned = sqlx::query_scalar::<_, bool>(&sql)
            .bind(name.as_str())
            .bind(owner.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(owned)
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<String>, GatewayError> {
        let sql = format!(
            "SELECT entity_name FROM {} WHERE owner = $1 ORDER BY entity_name",
            self.kind.table()
        );
        let names = sqlx::query_scalar::<_, String>(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }
}

#[async_trait]
impl AttachmentLedger for PostgresStore {
    async fn attach(&self, attachment: &Attachment) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO attachments (notebook_name, volume_name, owner) VALUES ($1, $2, $3) \
             ON CONFLICT (notebook_name, volume_name) DO NOTHING",
        )
        .bind(attachment.notebook.as_str())
        .bind(attachment.volume.as_str())
        .bind(attachment.owner.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn detach_notebook(&self, notebook: &EntityName) -> Result<u64, GatewayError> {
        let result = sqlx::query("DELETE FROM attachments WHERE notebook_name = $1")
            .bind(notebook.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn detach_volume(&self, volume: &EntityName) -> Result<u64, GatewayError> {
        let result = sqlx::query("DELETE FROM attachments WHERE volume_name = $1")
            .bind(volume.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn attachments_for_notebook(
        &self,
        notebook: &EntityName,
    ) -> Result<Vec<Attachment>, GatewayError> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            "SELECT notebook_name, volume_name, owner FROM attachments \
             WHERE notebook_name = $1 ORDER BY volume_name",
        )
        .bind(notebook.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Attachment::try_from).collect()
    }

    async fn attachments_for_volume(
        &self,
        volume: &EntityName,
    ) -> Result<Vec<Attachment>, GatewayError> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            "SELECT notebook_name, volume_name, owner FROM attachments \
             WHERE volume_name = $1 ORDER BY notebook_name",
        )
        .bind(volume.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Attachment::try_from).collect()
    }
}

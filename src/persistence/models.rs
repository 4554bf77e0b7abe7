//! Database rows for the attachment ledger.

use sqlx::FromRow;

use crate::domain::{Attachment, EntityName, OwnerId};
use crate::error::GatewayError;

/// A row of the `attachments` table.
#[derive(Debug, Clone, FromRow)]
pub struct AttachmentRow {
    /// Notebook side of the link.
    pub notebook_name: String,
    /// Volume side of the link.
    pub volume_name: String,
    /// Principal that created the link.
    pub owner: String,
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = GatewayError;

    fn try_from(row: AttachmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            notebook: EntityName::parse(row.notebook_name).map_err(corrupt)?,
            volume: EntityName::parse(row.volume_name).map_err(corrupt)?,
            owner: OwnerId::parse(row.owner).map_err(corrupt)?,
        })
    }
}

fn corrupt(err: GatewayError) -> GatewayError {
    GatewayError::Persistence(format!("stored row failed validation: {err}"))
}

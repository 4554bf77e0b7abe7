//! Request and response bodies of the entity endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::EntityKind;
use crate::service::CreatedEntity;

/// Body of `POST /api/v1/{collection}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEntityRequest {
    /// Entity name; must be a DNS-1123 label.
    pub name: String,
    /// Optional peer entity to attach to (a volume for a notebook, a
    /// notebook for a volume).
    #[serde(default)]
    pub attach_to: Option<String>,
}

/// Response of `POST /api/v1/{collection}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedEntityResponse {
    /// Entity name.
    pub name: String,
    /// `notebook` or `volume`.
    #[schema(value_type = String)]
    pub kind: EntityKind,
    /// Platform identifier of the provisioned resource.
    pub platform_id: String,
    /// Access URL, present for notebooks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<CreatedEntity> for CreatedEntityResponse {
    fn from(created: CreatedEntity) -> Self {
        Self {
            name: created.name.to_string(),
            kind: created.kind,
            platform_id: created.platform_id,
            url: created.url,
        }
    }
}

/// Response of `GET /api/v1/{collection}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntityListResponse {
    /// Sorted entity names owned by the caller.
    pub names: Vec<String>,
}

/// Response of `GET /api/v1/platform/{collection}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceListResponse {
    /// Resource names present on the platform.
    pub resources: Vec<String>,
}

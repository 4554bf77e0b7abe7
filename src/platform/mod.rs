//! Orchestration platform boundary.
//!
//! The services never talk to the cluster directly; they go through a
//! [`PlatformClient`]. Calls are not retried.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{EntityKind, EntityName, OwnerId};
use crate::error::GatewayError;

pub use memory::InMemoryPlatform;

/// What to provision on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Compute session or storage volume.
    pub kind: EntityKind,
    /// Resource name, also the authoritative key.
    pub name: EntityName,
    /// Namespace the resource lives in.
    pub namespace: String,
    /// Principal the resource is labelled with.
    pub owner: OwnerId,
}

/// Failures reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// A resource with the same name already exists.
    #[error("{0} already exists on the platform")]
    AlreadyExists(String),
    /// No resource with that name exists.
    #[error("{0} does not exist on the platform")]
    NotFound(String),
    /// The platform could not be reached or refused the call.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl From<PlatformError> for GatewayError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            PlatformError::NotFound(_) => Self::NotFound(err.to_string()),
            PlatformError::Unavailable(_) => Self::Platform(err.to_string()),
        }
    }
}

/// Creates, deletes and lists workloads on the orchestration platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Provisions the resource and returns its platform identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::AlreadyExists`] on a name clash, or
    /// [`PlatformError::Unavailable`] if the call fails.
    async fn create_resource(&self, spec: &ResourceSpec) -> Result<String, PlatformError>;

    /// Tears the resource down.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NotFound`] if nothing by that name exists,
    /// or [`PlatformError::Unavailable`] if the call fails.
    async fn delete_resource(
        &self,
        kind: EntityKind,
        namespace: &str,
        name: &EntityName,
    ) -> Result<(), PlatformError>;

    /// Lists resource names of `kind` in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Unavailable`] if the call fails.
    async fn list_resources(
        &self,
        kind: EntityKind,
        namespace: &str,
    ) -> Result<Vec<String>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_mapping() {
        let conflict: GatewayError = PlatformError::AlreadyExists("nb1".into()).into();
        assert!(matches!(conflict, GatewayError::Conflict(_)));
        let missing: GatewayError = PlatformError::NotFound("nb1".into()).into();
        assert!(matches!(missing, GatewayError::NotFound(_)));
        let down: GatewayError = PlatformError::Unavailable("timeout".into()).into();
        assert!(down.is_internal());
    }
}

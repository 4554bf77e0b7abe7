//! Service layer: cache-aside coordination, domain operations, and
//! reconciliation of peer events.
//!
//! [`EntityService`] is what the HTTP handlers call. It drives the
//! orchestration platform, the [`CacheAside`] coordinator, the attachment
//! ledger and the message bus. [`reconcile`] holds the handlers the consume
//! loop dispatches peer deletions to.

pub mod cache_aside;
pub mod entity_service;
pub mod reconcile;

pub use cache_aside::CacheAside;
pub use entity_service::{CreatedEntity, EntityService, ServiceSettings};
pub use reconcile::{PeerDeletionHandler, handlers_for};

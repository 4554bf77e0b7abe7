//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::api::auth::TokenVerifier;
use crate::service::EntityService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Domain service for all business logic.
    pub service: Arc<EntityService>,
    /// Bearer token verifier used by the principal extractor.
    pub verifier: Arc<TokenVerifier>,
}

//! REST endpoint handlers organized by resource.

pub mod entities;
pub mod system;

use axum::Router;

use crate::app_state::AppState;
use crate::domain::EntityKind;

/// Composes all resource routes under `/api/v1`.
pub fn routes(kind: EntityKind) -> Router<AppState> {
    Router::new().merge(entities::routes(kind))
}

//! Entity handlers: list, create, delete, and platform listing.
//!
//! The collection segment is `notebooks` or `volumes` depending on the
//! domain the process serves; the handlers themselves are kind-agnostic.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::api::auth::Principal;
use crate::api::dto::{
    CreateEntityRequest, CreatedEntityResponse, EntityListResponse, ResourceListResponse,
};
use crate::app_state::AppState;
use crate::domain::{EntityKind, EntityName};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /{collection}` — List the caller's entities.
///
/// # Errors
///
/// Returns [`GatewayError`] if the authoritative store fails on a cold read.
#[utoipa::path(
    get,
    path = "/api/v1/{collection}",
    tag = "Entities",
    summary = "List owned entities",
    description = "Returns the names of the caller's entities. Served from the cache when warm, otherwise from the authoritative store.",
    params(("collection" = String, Path, description = "`notebooks` or `volumes`")),
    responses(
        (status = 200, description = "Entity names", body = EntityListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_entities(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Result<impl IntoResponse, GatewayError> {
    let names = state.service.list_entities(&owner).await?;
    Ok(Json(EntityListResponse { names }))
}

/// `POST /{collection}` — Create an entity.
///
/// # Errors
///
/// Returns [`GatewayError`] on an invalid name, a name clash, or a
/// collaborator failure.
#[utoipa::path(
    post,
    path = "/api/v1/{collection}",
    tag = "Entities",
    summary = "Create an entity",
    description = "Provisions the resource on the platform, records it, and publishes a CREATE event. A 500 may be returned after the record was committed.",
    params(("collection" = String, Path, description = "`notebooks` or `volumes`")),
    request_body = CreateEntityRequest,
    responses(
        (status = 201, description = "Entity created", body = CreatedEntityResponse),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 409, description = "Name already taken", body = ErrorResponse),
        (status = 500, description = "Store, platform or broker failure", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_entity(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Json(req): Json<CreateEntityRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let name = EntityName::parse(req.name)?;
    let attach_to = req.attach_to.map(EntityName::parse).transpose()?;

    let created = state
        .service
        .create_entity(&owner, name, attach_to)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedEntityResponse::from(created)),
    ))
}

/// `DELETE /{collection}/{name}` — Delete an entity.
///
/// # Errors
///
/// Returns [`GatewayError`] if the caller does not own the entity or a
/// collaborator fails.
#[utoipa::path(
    delete,
    path = "/api/v1/{collection}/{name}",
    tag = "Entities",
    summary = "Delete an entity",
    description = "Checks ownership against the authoritative store, tears the resource down, and publishes a DELETE event.",
    params(
        ("collection" = String, Path, description = "`notebooks` or `volumes`"),
        ("name" = String, Path, description = "Entity name"),
    ),
    responses(
        (status = 204, description = "Entity deleted"),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller does not own the entity", body = ErrorResponse),
        (status = 404, description = "Removed by a concurrent delete", body = ErrorResponse),
        (status = 500, description = "Store, platform or broker failure", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn delete_entity(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let name = EntityName::parse(name)?;
    state.service.delete_entity(&owner, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /platform/{collection}` — List resources on the platform.
///
/// # Errors
///
/// Returns [`GatewayError`] if the platform is unavailable.
#[utoipa::path(
    get,
    path = "/api/v1/platform/{collection}",
    tag = "Entities",
    summary = "List platform resources",
    description = "Lists every resource of this kind in the service namespace, straight from the platform.",
    params(("collection" = String, Path, description = "`notebooks` or `volumes`")),
    responses(
        (status = 200, description = "Resource names", body = ResourceListResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 500, description = "Platform failure", body = ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_resources(
    State(state): State<AppState>,
    Principal(_owner): Principal,
) -> Result<impl IntoResponse, GatewayError> {
    let resources = state.service.list_platform_resources().await?;
    Ok(Json(ResourceListResponse { resources }))
}

/// Entity routes for the collection of `kind`.
///
/// The platform listing lives outside the collection so every valid entity
/// name, `resources` included, stays addressable by `DELETE`.
pub fn routes(kind: EntityKind) -> Router<AppState> {
    let collection = kind.collection_path();
    Router::new()
        .route(collection, get(list_entities).post(create_entity))
        .route(&format!("/platform{collection}"), get(list_resources))
        .route(&format!("{collection}/{{name}}"), delete(delete_entity))
}

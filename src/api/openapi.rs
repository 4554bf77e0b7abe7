//! OpenAPI document for the REST surface.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation of both domain services.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Workbench Gateway API",
        description = "Notebook and volume lifecycle endpoints"
    ),
    tags(
        (name = "Entities", description = "Notebook or volume lifecycle"),
        (name = "System", description = "Health and monitoring")
    ),
    paths(
        super::handlers::entities::list_entities,
        super::handlers::entities::create_entity,
        super::handlers::entities::delete_entity,
        super::handlers::entities::list_resources,
        super::handlers::system::health_handler,
    ),
    components(schemas(
        super::dto::CreateEntityRequest,
        super::dto::CreatedEntityResponse,
        super::dto::EntityListResponse,
        super::dto::ResourceListResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

//! REST API layer: route handlers, DTOs, principal extraction, and router
//! composition.
//!
//! Entity endpoints are mounted under `/api/v1`; `/health` sits at the root.
//! With the `swagger-ui` feature, the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable at `/swagger-ui`.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;
use crate::domain::EntityKind;

/// Builds the complete API router for a service of `kind`.
pub fn build_router(kind: EntityKind) -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes(kind))
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::ServiceExt;

    use super::*;
    use crate::api::auth::{Claims, TokenVerifier};
    use crate::cache::{CacheRepository, InMemoryCache};
    use crate::messaging::{InProcessBus, MessageBus};
    use crate::persistence::{AttachmentLedger, AuthoritativeRepository, InMemoryStore};
    use crate::platform::{InMemoryPlatform, PlatformClient};
    use crate::service::{CacheAside, EntityService, ServiceSettings};

    const SECRET: &[u8] = b"api-test-secret";

    fn app() -> Router {
        let kind = EntityKind::Notebook;
        let store = Arc::new(InMemoryStore::new(kind));
        let coordinator = CacheAside::new(
            kind,
            Arc::clone(&store) as Arc<dyn AuthoritativeRepository>,
            Arc::new(InMemoryCache::new()) as Arc<dyn CacheRepository>,
            Duration::from_secs(60),
        );
        let service = EntityService::new(
            kind,
            coordinator,
            store as Arc<dyn AttachmentLedger>,
            Arc::new(InMemoryPlatform::new()) as Arc<dyn PlatformClient>,
            Arc::new(InProcessBus::new(16)) as Arc<dyn MessageBus>,
            ServiceSettings {
                namespace: "default".to_string(),
                url_base: "http://localhost:8080".to_string(),
            },
        );
        build_router(kind).with_state(AppState {
            service: Arc::new(service),
            verifier: Arc::new(TokenVerifier::from_secret(SECRET)),
        })
    }

    fn bearer(owner: &str) -> String {
        let exp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0) + 3600;
        let claims = Claims {
            iss: owner.to_string(),
            exp,
        };
        let Ok(token) = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)) else {
            panic!("encoding failed");
        };
        format!("Bearer {token}")
    }

    fn request(method: &str, uri: &str, owner: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header(header::AUTHORIZATION, bearer(owner));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let Ok(request) = builder.body(body) else {
            panic!("request build failed");
        };
        request
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let Ok(response) = app.clone().oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_reports_domain() {
        let app = app();
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["domain"], "notebook");
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let app = app();
        let (status, body) = send(&app, request("GET", "/api/v1/notebooks", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], 1002);
    }

    #[tokio::test]
    async fn create_list_delete_flow() {
        let app = app();

        let (status, body) = send(
            &app,
            request("POST", "/api/v1/notebooks", Some("alice"), Some(r#"{"name":"nb1"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["url"], "http://localhost:8080/notebook/default/nb1/");

        let (status, body) = send(&app, request("GET", "/api/v1/notebooks", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["names"], serde_json::json!(["nb1"]));

        let (status, body) = send(
            &app,
            request("GET", "/api/v1/platform/notebooks", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resources"], serde_json::json!(["nb1"]));

        let (status, _) = send(&app, request("DELETE", "/api/v1/notebooks/nb1", Some("bob"), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, request("DELETE", "/api/v1/notebooks/nb1", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn entity_named_resources_is_deletable() {
        let app = app();
        let (status, _) = send(
            &app,
            request("POST", "/api/v1/notebooks", Some("alice"), Some(r#"{"name":"resources"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &app,
            request("DELETE", "/api/v1/notebooks/resources", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, request("GET", "/api/v1/notebooks", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["names"], serde_json::json!([]));

        let (status, body) = send(
            &app,
            request("GET", "/api/v1/platform/notebooks", Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resources"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let app = app();
        let body = Some(r#"{"name":"nb1"}"#);
        let (first, _) = send(&app, request("POST", "/api/v1/notebooks", Some("alice"), body)).await;
        assert_eq!(first, StatusCode::CREATED);
        let (second, json) = send(&app, request("POST", "/api/v1/notebooks", Some("bob"), body)).await;
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], 2002);
    }

    #[tokio::test]
    async fn invalid_name_is_bad_request() {
        let app = app();
        let (status, _) = send(
            &app,
            request("POST", "/api/v1/notebooks", Some("alice"), Some(r#"{"name":"Not_Valid"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn other_domain_collection_is_not_served() {
        let app = app();
        let (status, _) = send(&app, request("GET", "/api/v1/volumes", Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

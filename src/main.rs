//! workbench-gateway server entry point.
//!
//! Wires the configured backends, starts the peer-event consume loop, and
//! serves the REST API for one domain.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use workbench_gateway::api;
use workbench_gateway::api::auth::TokenVerifier;
use workbench_gateway::app_state::AppState;
use workbench_gateway::cache::{CacheRepository, InMemoryCache, RedisCache};
use workbench_gateway::config::{BusBackend, CacheBackend, GatewayConfig, StoreBackend};
use workbench_gateway::messaging::{AmqpBus, InProcessBus, MessageBus};
use workbench_gateway::persistence::{
    AttachmentLedger, AuthoritativeRepository, InMemoryStore, PostgresStore,
};
use workbench_gateway::platform::{InMemoryPlatform, PlatformClient};
use workbench_gateway::service::{CacheAside, EntityService, ServiceSettings, handlers_for};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let kind = config.domain;
    tracing::info!(addr = %config.listen_addr, domain = %kind, "starting workbench-gateway");

    // Authoritative store and attachment ledger
    let (store, ledger): (Arc<dyn AuthoritativeRepository>, Arc<dyn AttachmentLedger>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let pg = Arc::new(
                    PostgresStore::connect(
                        &config.database_url,
                        kind,
                        config.database_max_connections,
                        config.database_min_connections,
                        config.database_connect_timeout,
                    )
                    .await
                    .context("connecting to PostgreSQL")?,
                );
                (
                    Arc::clone(&pg) as Arc<dyn AuthoritativeRepository>,
                    pg as Arc<dyn AttachmentLedger>,
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store, records are lost on restart");
                let mem = Arc::new(InMemoryStore::new(kind));
                (
                    Arc::clone(&mem) as Arc<dyn AuthoritativeRepository>,
                    mem as Arc<dyn AttachmentLedger>,
                )
            }
        };

    // Cache
    let cache: Arc<dyn CacheRepository> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(
            RedisCache::connect(&config.redis_url, kind)
                .await
                .context("connecting to Redis")?,
        ),
        CacheBackend::Memory => Arc::new(InMemoryCache::new()),
    };

    // Message bus
    let bus: Arc<dyn MessageBus> = match config.bus_backend {
        BusBackend::Amqp => Arc::new(
            AmqpBus::connect(&config.amqp_url, &config.amqp_exchange, kind.as_str())
                .await
                .context("connecting to the message broker")?,
        ),
        BusBackend::Memory => Arc::new(InProcessBus::new(config.event_bus_capacity)),
    };

    // Peer-deletion consume loop, runs for the process lifetime
    let _consumer = bus
        .consume(handlers_for(kind, Arc::clone(&ledger)))
        .await
        .context("starting the consume loop")?;

    // Build service layer
    let coordinator = CacheAside::new(kind, store, cache, config.cache_ttl);
    let service = Arc::new(EntityService::new(
        kind,
        coordinator,
        ledger,
        Arc::new(InMemoryPlatform::new()) as Arc<dyn PlatformClient>,
        bus,
        ServiceSettings {
            namespace: config.platform_namespace.clone(),
            url_base: config.url_base.clone(),
        },
    ));

    // Build application state
    let app_state = AppState {
        service,
        verifier: Arc::new(TokenVerifier::from_secret(config.jwt_secret.as_bytes())),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router(kind))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

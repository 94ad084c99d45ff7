//! Router configuration for the entity API.
//!
//! This module defines the HTTP routes and applies middleware for
//! authentication, CORS and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                                       - Health check (public)
//! /data/entities                                - Entity listing (protected)
//! /data/entities/all                            - Entity listing (protected)
//! /data/entities/with-tasks                     - Listing with tasks (protected)
//! /data/entities/{entity_id}                    - Get / delete (protected)
//! /data/entities/{entity_id}/task-types         - (protected)
//! /data/entities/{entity_id}/tasks              - (protected)
//! /data/entities/{entity_id}/preview-files      - (protected)
//! /data/entities/{entity_id}/versions           - (protected)
//! /data/episodes/{episode_id}/entities          - (protected)
//! /data/episodes/{episode_id}/entity-tasks      - (protected)
//! /data/projects/{project_id}/entities          - List / create (protected)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use entity_api::server::routes::{create_router, RouterConfig};
//! use entity_api::store::{EntityService, MemoryStore};
//!
//! let service = EntityService::new(MemoryStore::load("fixtures.json")?);
//! let config = RouterConfig::new("my-secret-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{auth_middleware, SessionAuth, PERSON_ID_HEADER};
use super::handlers::{
    create_project_entity_handler, delete_entity_handler, entities_handler,
    entities_with_tasks_handler, entity_handler, entity_preview_files_handler,
    entity_task_types_handler, entity_tasks_handler, entity_versions_handler,
    episode_entities_handler, episode_entity_tasks_handler, health_handler,
    project_entities_handler, AppState,
};
use crate::store::{EntityService, EntityStore};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret key for session tokens
    pub auth_secret: String,

    /// Whether bearer tokens are required on `/data` routes
    pub auth_enabled: bool,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given auth secret.
    ///
    /// By default:
    /// - Authentication is enabled
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(auth_secret: impl Into<String>) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            auth_enabled: true,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration with authentication disabled.
    ///
    /// Callers are then identified by the `X-Person-Id` header.
    /// **Warning**: This should only be used for development/testing.
    pub fn without_auth() -> Self {
        Self {
            auth_secret: String::new(),
            auth_enabled: false,
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// All `/data` routes run behind [`auth_middleware`]; `/health` is public.
/// Static segments such as `/data/entities/all` take precedence over the
/// `{entity_id}` parameter.
pub fn create_router<S>(
    service: impl Into<Arc<EntityService<S>>>,
    config: RouterConfig,
) -> Router
where
    S: EntityStore + 'static,
{
    let mut app_state = AppState::new(service);
    if config.auth_enabled {
        app_state = app_state.with_auth(SessionAuth::new(&config.auth_secret));
    }

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .nest("/data", data_routes(app_state))
        .route("/health", get(health_handler))
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the protected `/data` routes.
fn data_routes<S>(app_state: AppState<S>) -> Router
where
    S: EntityStore + 'static,
{
    // Auth is layered on the nested router so it never runs for /health
    Router::new()
        .route("/entities", get(entities_handler::<S>))
        .route("/entities/all", get(entities_handler::<S>))
        .route(
            "/entities/with-tasks",
            get(entities_with_tasks_handler::<S>),
        )
        .route(
            "/entities/{entity_id}",
            get(entity_handler::<S>).delete(delete_entity_handler::<S>),
        )
        .route(
            "/entities/{entity_id}/task-types",
            get(entity_task_types_handler::<S>),
        )
        .route("/entities/{entity_id}/tasks", get(entity_tasks_handler::<S>))
        .route(
            "/entities/{entity_id}/preview-files",
            get(entity_preview_files_handler::<S>),
        )
        .route(
            "/entities/{entity_id}/versions",
            get(entity_versions_handler::<S>),
        )
        .route(
            "/episodes/{episode_id}/entities",
            get(episode_entities_handler::<S>),
        )
        .route(
            "/episodes/{episode_id}/entity-tasks",
            get(episode_entity_tasks_handler::<S>),
        )
        .route(
            "/projects/{project_id}/entities",
            get(project_entities_handler::<S>).post(create_project_entity_handler::<S>),
        )
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware::<S>,
        ))
        .with_state(app_state)
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(PERSON_ID_HEADER),
        ])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Create a development router with authentication disabled.
///
/// **Warning**: This should only be used for local development and testing.
pub fn create_dev_router<S>(service: impl Into<Arc<EntityService<S>>>) -> Router
where
    S: EntityStore + 'static,
{
    create_router(service, RouterConfig::without_auth())
}

// =============================================================================
// Tests
// =============================================================================

//! HTTP request handlers for the entity API.
//!
//! Every `/data` handler follows the same sequence: resolve the record the
//! route names, run the access checks for the caller, then delegate to the
//! [`EntityService`]. Any failure aborts the request; no partial results
//! are returned.
//!
//! # Endpoints
//!
//! - `GET    /data/entities`, `/data/entities/all` - Filtered entity listing
//! - `GET    /data/entities/with-tasks` - Listing with project name and tasks
//! - `GET    /data/entities/{entity_id}` - Full entity
//! - `DELETE /data/entities/{entity_id}` - Remove an entity
//! - `GET    /data/entities/{entity_id}/task-types|tasks|preview-files|versions`
//! - `GET    /data/episodes/{episode_id}/entities|entity-tasks`
//! - `GET    /data/projects/{project_id}/entities` - Project entities
//! - `POST   /data/projects/{project_id}/entities` - Create an entity
//! - `GET    /health` - Health check

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{EntityError, StoreError};
use crate::model::{
    Caller, Criteria, Entity, EntityVersion, EntityWithTasks, FullEntity, PreviewFile, TaskType,
};
use crate::store::{EntityService, EntityStore};

use super::access::Access;
use super::args::{parse_criteria, parse_force, parse_relations, CreateEntityArgs};
use super::auth::SessionAuth;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers and the auth middleware.
pub struct AppState<S: EntityStore> {
    pub service: Arc<EntityService<S>>,

    /// Token verifier; `None` when authentication is disabled
    pub auth: Option<SessionAuth>,
}

impl<S: EntityStore> AppState<S> {
    pub fn new(service: impl Into<Arc<EntityService<S>>>) -> Self {
        Self {
            service: service.into(),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: SessionAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    fn access<'a>(&'a self, caller: &'a Caller) -> Access<'a, S> {
        Access::new(&self.service, caller)
    }
}

impl<S: EntityStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            auth: self.auth.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert EntityError to HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other 4xx at WARN.
impl IntoResponse for EntityError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            EntityError::Store(StoreError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            EntityError::Store(StoreError::HasDependents { .. }) => {
                (StatusCode::CONFLICT, "has_dependents")
            }
            EntityError::Store(StoreError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            EntityError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EntityError::Permission(_) => (StatusCode::FORBIDDEN, "permission_denied"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

type ApiResult<T> = Result<T, EntityError>;

// =============================================================================
// Handlers
// =============================================================================

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle single entity requests.
///
/// # Endpoint
///
/// `GET /data/entities/{entity_id}`
///
/// Returns the entity with `project_name`, `episode_name` (when the entity
/// belongs to an episode) and its `tasks`. A cached miss is dropped and
/// the lookup retried once before answering 404.
pub async fn entity_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(entity_id): Path<String>,
) -> ApiResult<Json<FullEntity>> {
    let service = &state.service;

    let entity = match service.get_full_entity(&entity_id).await? {
        Some(entity) => entity,
        None => {
            service.clear_entity_cache(&entity_id).await;
            service
                .get_full_entity(&entity_id)
                .await?
                .ok_or_else(|| StoreError::not_found("Entity", &entity_id))?
        }
    };

    let access = state.access(&caller);
    access
        .check_project_access(Some(&entity.entity.project_id))
        .await?;
    access.check_entity_access(&entity.entity.id).await?;

    Ok(Json(FullEntity::clone(&entity)))
}

/// Handle entity removal.
///
/// # Endpoint
///
/// `DELETE /data/entities/{entity_id}?force=true`
///
/// Requires manager access on the entity's project. Without `force`, an
/// entity that other records depend on is kept and 409 is returned.
pub async fn delete_entity_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(entity_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<StatusCode> {
    let force = parse_force(query.as_deref());
    let entity = state.service.get_entity(&entity_id).await?;

    state
        .access(&caller)
        .check_manager_project_access(&entity.project_id)
        .await?;
    state.service.remove_entity(&entity_id, force).await?;

    info!(entity_id = %entity_id, person_id = %caller.person_id, force, "Entity removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Parse listing criteria and narrow them to what the caller may see.
async fn listing_criteria<S: EntityStore>(
    state: &AppState<S>,
    caller: &Caller,
    query: Option<&str>,
) -> ApiResult<Criteria> {
    let mut criteria = parse_criteria(query)?;

    let access = state.access(caller);
    access.check_project_access(criteria.project_id()).await?;
    access.scope_criteria(&mut criteria).await?;

    Ok(criteria)
}

/// Handle filtered entity listings.
///
/// # Endpoint
///
/// `GET /data/entities` and `GET /data/entities/all`
///
/// Query pairs other than `relations`, `page` and `limit` are exact-match
/// filters, e.g. `?project_id=...&kind=shot`.
pub async fn entities_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<Entity>>> {
    let criteria = listing_criteria(&state, &caller, query.as_deref()).await?;
    let entities = state.service.get_entities(&criteria).await?;

    debug!(count = entities.len(), "Listed entities");
    Ok(Json(entities))
}

/// Handle entity listings joined with project name and tasks.
///
/// # Endpoint
///
/// `GET /data/entities/with-tasks`
pub async fn entities_with_tasks_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<EntityWithTasks>>> {
    let criteria = listing_criteria(&state, &caller, query.as_deref()).await?;
    Ok(Json(state.service.get_entities_and_tasks(&criteria).await?))
}

/// Resolve an entity and run the read checks on it.
async fn readable_entity<S: EntityStore>(
    state: &AppState<S>,
    caller: &Caller,
    entity_id: &str,
) -> ApiResult<Entity> {
    let entity = state.service.get_entity(entity_id).await?;

    let access = state.access(caller);
    access.check_project_access(Some(&entity.project_id)).await?;
    access.check_entity_access(&entity.id).await?;

    Ok(entity)
}

/// `GET /data/entities/{entity_id}/task-types`
pub async fn entity_task_types_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(entity_id): Path<String>,
) -> ApiResult<Json<Vec<TaskType>>> {
    let entity = readable_entity(&state, &caller, &entity_id).await?;
    Ok(Json(
        state.service.get_task_types_for_entity(&entity.id).await?,
    ))
}

/// `GET /data/entities/{entity_id}/tasks?relations=true`
pub async fn entity_tasks_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(entity_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<Value>>> {
    let entity = readable_entity(&state, &caller, &entity_id).await?;
    let relations = parse_relations(query.as_deref())?;
    Ok(Json(
        state
            .service
            .get_tasks_for_entity(&entity.id, relations)
            .await?,
    ))
}

/// Handle preview file listings.
///
/// # Endpoint
///
/// `GET /data/entities/{entity_id}/preview-files`
///
/// # Response
///
/// Previews grouped by task type id, each group in insertion order:
/// ```json
/// { "task-type-1": [{ "id": "...", "revision": 1 }], "task-type-2": [] }
/// ```
pub async fn entity_preview_files_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(entity_id): Path<String>,
) -> ApiResult<Json<BTreeMap<String, Vec<PreviewFile>>>> {
    let entity = readable_entity(&state, &caller, &entity_id).await?;
    Ok(Json(
        state.service.get_preview_files_for_entity(&entity.id).await?,
    ))
}

/// `GET /data/entities/{entity_id}/versions`, newest first.
pub async fn entity_versions_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(entity_id): Path<String>,
) -> ApiResult<Json<Vec<EntityVersion>>> {
    let entity = readable_entity(&state, &caller, &entity_id).await?;
    Ok(Json(state.service.get_entity_versions(&entity.id).await?))
}

/// Resolve an episode and run the read checks on it.
async fn readable_episode<S: EntityStore>(
    state: &AppState<S>,
    caller: &Caller,
    episode_id: &str,
) -> ApiResult<Entity> {
    let episode = state.service.get_episode(episode_id).await?;

    let access = state.access(caller);
    access.check_project_access(Some(&episode.project_id)).await?;
    access.check_entity_access(&episode.id).await?;

    Ok(episode)
}

/// `GET /data/episodes/{episode_id}/entities?relations=true`
pub async fn episode_entities_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(episode_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<Value>>> {
    let episode = readable_episode(&state, &caller, &episode_id).await?;
    let relations = parse_relations(query.as_deref())?;
    Ok(Json(
        state
            .service
            .get_entities_for_episode(&episode.id, relations)
            .await?,
    ))
}

/// Handle episode task listings.
///
/// # Endpoint
///
/// `GET /data/episodes/{episode_id}/entity-tasks?relations=true`
///
/// Not available to vendors, even when they pass the episode checks.
pub async fn episode_entity_tasks_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(episode_id): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<Vec<Value>>> {
    let episode = readable_episode(&state, &caller, &episode_id).await?;
    state.access(&caller).deny_vendor()?;

    let relations = parse_relations(query.as_deref())?;
    Ok(Json(
        state
            .service
            .get_entity_tasks_for_episode(&episode.id, relations)
            .await?,
    ))
}

/// `GET /data/projects/{project_id}/entities`
///
/// Vendors only get entities with a task assigned to them.
pub async fn project_entities_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    let project = state.service.get_project(&project_id).await?;

    let access = state.access(&caller);
    access.check_project_access(Some(&project.id)).await?;

    Ok(Json(
        state
            .service
            .get_entities_for_project(&project.id, access.only_assigned())
            .await?,
    ))
}

/// Handle entity creation.
///
/// # Endpoint
///
/// `POST /data/projects/{project_id}/entities`
///
/// # Request Body
///
/// JSON or form-encoded:
/// ```json
/// { "name": "Tree", "description": "", "data": { "k": 1 }, "episode_id": null }
/// ```
///
/// Only `name` is required. Returns `201 Created` with the new entity.
pub async fn create_project_entity_handler<S: EntityStore>(
    State(state): State<AppState<S>>,
    caller: Caller,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Entity>)> {
    let project = state.service.get_project(&project_id).await?;
    state
        .access(&caller)
        .check_manager_project_access(&project.id)
        .await?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let args = CreateEntityArgs::from_body(content_type, &body)?;

    let entity = state
        .service
        .create_entity(args.into_new_entity(project.id), Some(&caller.person_id))
        .await?;

    info!(
        entity_id = %entity.id,
        project_id = %entity.project_id,
        person_id = %caller.person_id,
        "Entity created"
    );
    Ok((StatusCode::CREATED, Json(entity)))
}

// =============================================================================
// Tests
// =============================================================================

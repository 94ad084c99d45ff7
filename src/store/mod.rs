//! Service facade for entity persistence and queries.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             EntityService               │
//! │  (not-found mapping, full-entity cache) │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           EntityStore Trait             │
//! │     (storage-agnostic data access)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!             ┌─────────────────┐
//!             │   MemoryStore   │
//!             │ (JSON fixtures) │
//!             └─────────────────┘
//! ```

mod cache;
mod memory;
mod service;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::model::{
    Criteria, Entity, EntityVersion, EntityWithTasks, FullEntity, NewEntity, Person, PreviewFile,
    Project, Relations, TaskType,
};

pub use cache::{CachedEntity, EntityCache, DEFAULT_ENTITY_CACHE_CAPACITY};
pub use memory::{Fixture, MemoryStore, StoreStats};
pub use service::EntityService;

/// Data access for entities and the records around them.
///
/// Lookups return `Ok(None)` for missing records; [`EntityService`] turns
/// those into [`StoreError::NotFound`] where a record is required.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn person(&self, person_id: &str) -> Result<Option<Person>, StoreError>;

    async fn project(&self, project_id: &str) -> Result<Option<Project>, StoreError>;

    /// Ids of the projects whose team includes the person.
    async fn projects_for_person(&self, person_id: &str) -> Result<Vec<String>, StoreError>;

    async fn entity(&self, entity_id: &str) -> Result<Option<Entity>, StoreError>;

    /// Entity joined with its project, episode and tasks.
    async fn full_entity(&self, entity_id: &str) -> Result<Option<FullEntity>, StoreError>;

    /// Whether a task of the entity is assigned to the person.
    async fn is_assigned(&self, person_id: &str, entity_id: &str) -> Result<bool, StoreError>;

    async fn find_entities(&self, criteria: &Criteria) -> Result<Vec<Entity>, StoreError>;

    /// Like [`find_entities`](Self::find_entities), with project name and
    /// tasks. When `assigned_to` is set only that person's tasks are included.
    async fn find_entities_with_tasks(
        &self,
        criteria: &Criteria,
    ) -> Result<Vec<EntityWithTasks>, StoreError>;

    async fn entities_for_project(
        &self,
        project_id: &str,
        assigned_to: Option<&str>,
    ) -> Result<Vec<Entity>, StoreError>;

    async fn entities_for_episode(
        &self,
        episode_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError>;

    async fn insert_entity(
        &self,
        new_entity: NewEntity,
        author_id: Option<&str>,
    ) -> Result<Entity, StoreError>;

    /// Remove an entity. Without `force`, fails with
    /// [`StoreError::HasDependents`] when other records refer to it.
    async fn delete_entity(&self, entity_id: &str, force: bool) -> Result<(), StoreError>;

    /// Version history, newest first.
    async fn entity_versions(&self, entity_id: &str) -> Result<Vec<EntityVersion>, StoreError>;

    async fn task_types_for_entity(&self, entity_id: &str) -> Result<Vec<TaskType>, StoreError>;

    async fn tasks_for_entity(
        &self,
        entity_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError>;

    async fn tasks_for_episode(
        &self,
        episode_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError>;

    /// Preview files of the entity grouped by task type id.
    async fn preview_files_for_entity(
        &self,
        entity_id: &str,
    ) -> Result<BTreeMap<String, Vec<PreviewFile>>, StoreError>;
}

//! Entity service facade.
//!
//! The EntityService is what the HTTP handlers talk to. It wraps an
//! [`EntityStore`] and adds:
//! - Not-found mapping for lookups that require a record
//! - A read-through cache of full-entity views
//! - Cache invalidation on create and remove
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      EntityService                       │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │               get_full_entity()                    │  │
//! │  │  1. Check cache        3. Cache hit or miss        │  │
//! │  │  2. Query store        4. Return                   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │             │                              │             │
//! │             ▼                              ▼             │
//! │      ┌─────────────┐              ┌───────────────┐      │
//! │      │ EntityCache │              │  EntityStore  │      │
//! │      └─────────────┘              └───────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::model::{
    Criteria, Entity, EntityVersion, EntityWithTasks, FullEntity, NewEntity, Person, PreviewFile,
    Project, Relations, TaskType,
};

use super::cache::{CachedEntity, EntityCache};
use super::EntityStore;

/// Service for entity queries and mutations.
///
/// # Type Parameters
///
/// * `S` - The storage backend
///
/// # Example
///
/// ```ignore
/// use entity_api::store::{EntityService, MemoryStore};
///
/// let service = EntityService::new(MemoryStore::load("fixtures.json")?);
/// let entity = service.get_entity("e1").await?;
/// ```
pub struct EntityService<S: EntityStore> {
    store: Arc<S>,

    /// Full-entity views, including cached misses
    cache: EntityCache,
}

impl<S: EntityStore> EntityService<S> {
    /// Create a service with the default cache capacity.
    pub fn new(store: S) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    /// Create a service over a store shared with other components.
    pub fn with_shared_store(store: Arc<S>) -> Self {
        Self {
            store,
            cache: EntityCache::new(),
        }
    }

    /// Create a service caching at most `cache_capacity` full-entity views.
    pub fn with_cache_capacity(store: S, cache_capacity: usize) -> Self {
        Self {
            store: Arc::new(store),
            cache: EntityCache::with_capacity(cache_capacity),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Full view of an entity, served from the cache when possible.
    ///
    /// A miss is cached like a hit, so callers that need a fresh answer must
    /// [`clear_entity_cache`](Self::clear_entity_cache) first.
    pub async fn get_full_entity(
        &self,
        entity_id: &str,
    ) -> Result<Option<Arc<FullEntity>>, StoreError> {
        if let Some(cached) = self.cache.get(entity_id).await {
            debug!(entity_id, "Full entity cache hit");
            return Ok(cached.into_option());
        }

        // Taken before the read so a concurrent removal discards this result
        let generation = self.cache.generation();
        let entry = CachedEntity::from(self.store.full_entity(entity_id).await?);
        if !self
            .cache
            .put_if_current(entity_id, entry.clone(), generation)
            .await
        {
            debug!(entity_id, "Cache invalidated during lookup, result not cached");
        }
        Ok(entry.into_option())
    }

    pub async fn clear_entity_cache(&self, entity_id: &str) {
        if self.cache.invalidate(entity_id).await {
            debug!(entity_id, "Invalidated full entity cache entry");
        }
    }

    pub async fn get_entity(&self, entity_id: &str) -> Result<Entity, StoreError> {
        self.store
            .entity(entity_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Entity", entity_id))
    }

    /// Like [`get_entity`](Self::get_entity), but only matches episodes.
    pub async fn get_episode(&self, episode_id: &str) -> Result<Entity, StoreError> {
        self.store
            .entity(episode_id)
            .await?
            .filter(Entity::is_episode)
            .ok_or_else(|| StoreError::not_found("Episode", episode_id))
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, StoreError> {
        self.store
            .project(project_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Project", project_id))
    }

    pub async fn get_person(&self, person_id: &str) -> Result<Option<Person>, StoreError> {
        self.store.person(person_id).await
    }

    pub async fn projects_for_person(&self, person_id: &str) -> Result<Vec<String>, StoreError> {
        self.store.projects_for_person(person_id).await
    }

    pub async fn is_assigned(&self, person_id: &str, entity_id: &str) -> Result<bool, StoreError> {
        self.store.is_assigned(person_id, entity_id).await
    }

    // =========================================================================
    // Listings
    // =========================================================================

    pub async fn get_entities(&self, criteria: &Criteria) -> Result<Vec<Entity>, StoreError> {
        self.store.find_entities(criteria).await
    }

    pub async fn get_entities_and_tasks(
        &self,
        criteria: &Criteria,
    ) -> Result<Vec<EntityWithTasks>, StoreError> {
        self.store.find_entities_with_tasks(criteria).await
    }

    /// Entities of a project; with `assigned_to`, only those with a task
    /// assigned to that person.
    pub async fn get_entities_for_project(
        &self,
        project_id: &str,
        assigned_to: Option<&str>,
    ) -> Result<Vec<Entity>, StoreError> {
        self.store.entities_for_project(project_id, assigned_to).await
    }

    pub async fn get_entities_for_episode(
        &self,
        episode_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError> {
        self.store.entities_for_episode(episode_id, relations).await
    }

    pub async fn get_entity_versions(
        &self,
        entity_id: &str,
    ) -> Result<Vec<EntityVersion>, StoreError> {
        self.store.entity_versions(entity_id).await
    }

    pub async fn get_task_types_for_entity(
        &self,
        entity_id: &str,
    ) -> Result<Vec<TaskType>, StoreError> {
        self.store.task_types_for_entity(entity_id).await
    }

    pub async fn get_tasks_for_entity(
        &self,
        entity_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError> {
        self.store.tasks_for_entity(entity_id, relations).await
    }

    pub async fn get_entity_tasks_for_episode(
        &self,
        episode_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError> {
        self.store.tasks_for_episode(episode_id, relations).await
    }

    pub async fn get_preview_files_for_entity(
        &self,
        entity_id: &str,
    ) -> Result<BTreeMap<String, Vec<PreviewFile>>, StoreError> {
        self.store.preview_files_for_entity(entity_id).await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create_entity(
        &self,
        new_entity: NewEntity,
        author_id: Option<&str>,
    ) -> Result<Entity, StoreError> {
        let entity = self.store.insert_entity(new_entity, author_id).await?;
        // A miss may have been cached for this id, and an episode's children
        // changed
        self.cache.invalidate(&entity.id).await;
        if let Some(episode_id) = &entity.episode_id {
            self.cache.invalidate(episode_id).await;
        }
        Ok(entity)
    }

    pub async fn remove_entity(&self, entity_id: &str, force: bool) -> Result<(), StoreError> {
        self.store.delete_entity(entity_id, force).await?;
        if force {
            // Children may have lost their episode link
            self.cache.clear().await;
        } else {
            self.cache.invalidate(entity_id).await;
        }
        Ok(())
    }
}

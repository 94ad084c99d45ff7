//! In-memory entity store.
//!
//! Holds every table in a single [`Fixture`] behind an async `RwLock`. The
//! store can start empty or be seeded from a JSON fixture file:
//!
//! ```json
//! {
//!   "persons":  [{ "id": "p-ada", "first_name": "Ada", "role": "manager" }],
//!   "projects": [{ "id": "prj", "name": "Big Buck", "team": ["p-ada"] }],
//!   "entities": [{ "id": "e1", "name": "Hero", "project_id": "prj" }]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Criteria, Entity, EntityVersion, EntityWithTasks, FullEntity, NewEntity, Person, PreviewFile,
    Project, Relations, Task, TaskType,
};

use super::EntityStore;

/// All records held by a [`MemoryStore`], in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub persons: Vec<Person>,
    pub projects: Vec<Project>,
    pub entities: Vec<Entity>,
    pub task_types: Vec<TaskType>,
    pub tasks: Vec<Task>,
    pub preview_files: Vec<PreviewFile>,
    pub versions: Vec<EntityVersion>,
}

impl Fixture {
    fn find_person(&self, person_id: &str) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == person_id)
    }

    fn find_project(&self, project_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    fn find_entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == entity_id)
    }

    fn find_task_type(&self, task_type_id: &str) -> Option<&TaskType> {
        self.task_types.iter().find(|t| t.id == task_type_id)
    }

    fn project_name(&self, project_id: &str) -> String {
        self.find_project(project_id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn tasks_of<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.entity_id == entity_id)
    }

    fn is_assigned(&self, person_id: &str, entity_id: &str) -> bool {
        self.tasks_of(entity_id).any(|t| t.is_assigned_to(person_id))
    }

    fn matches(&self, criteria: &Criteria, entity: &Entity) -> bool {
        criteria.matches(entity)
            && criteria
                .assigned_to()
                .map_or(true, |person_id| self.is_assigned(person_id, &entity.id))
    }

    fn render_task(&self, task: &Task, relations: Relations) -> Result<Value, StoreError> {
        let mut value = to_value(task)?;
        let Some(fields) = value.as_object_mut() else {
            return Ok(value);
        };

        match relations {
            Relations::Omit => {
                fields.remove("assignees");
            }
            Relations::Ids => {}
            Relations::Full => {
                let assignees = task
                    .assignees
                    .iter()
                    .filter_map(|id| self.find_person(id))
                    .map(to_value)
                    .collect::<Result<Vec<_>, _>>()?;
                fields.insert("assignees".to_string(), Value::Array(assignees));

                let task_type = match self.find_task_type(&task.task_type_id) {
                    Some(task_type) => to_value(task_type)?,
                    None => Value::Null,
                };
                fields.insert("task_type".to_string(), task_type);
            }
        }

        Ok(value)
    }

    fn render_entity(&self, entity: &Entity, relations: Relations) -> Result<Value, StoreError> {
        let mut value = to_value(entity)?;
        let Some(fields) = value.as_object_mut() else {
            return Ok(value);
        };

        let tasks = match relations {
            Relations::Omit => return Ok(value),
            Relations::Ids => self
                .tasks_of(&entity.id)
                .map(|t| Value::String(t.id.clone()))
                .collect(),
            Relations::Full => self
                .tasks_of(&entity.id)
                .map(|t| self.render_task(t, Relations::Ids))
                .collect::<Result<Vec<_>, _>>()?,
        };
        fields.insert("tasks".to_string(), Value::Array(tasks));

        Ok(value)
    }
}

fn to_value<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Storage(e.to_string()))
}

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of full-entity lookups served
    pub full_entity_reads: usize,

    /// Number of successful inserts and deletes
    pub mutations: usize,
}

/// Entity store keeping every record in memory.
pub struct MemoryStore {
    tables: RwLock<Fixture>,
    full_entity_reads: AtomicUsize,
    mutations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_fixture(Fixture::default())
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        Self {
            tables: RwLock::new(fixture),
            full_entity_reads: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
        }
    }

    /// Load a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Storage(format!("{}: {}", path.display(), e)))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Storage(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            full_entity_reads: self.full_entity_reads.load(Ordering::SeqCst),
            mutations: self.mutations.load(Ordering::SeqCst),
        }
    }

    /// Copy of all records currently held.
    pub async fn snapshot(&self) -> Fixture {
        self.tables.read().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn person(&self, person_id: &str) -> Result<Option<Person>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.find_person(person_id).cloned())
    }

    async fn project(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.find_project(project_id).cloned())
    }

    async fn projects_for_person(&self, person_id: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .iter()
            .filter(|p| p.has_member(person_id))
            .map(|p| p.id.clone())
            .collect())
    }

    async fn entity(&self, entity_id: &str) -> Result<Option<Entity>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.find_entity(entity_id).cloned())
    }

    async fn full_entity(&self, entity_id: &str) -> Result<Option<FullEntity>, StoreError> {
        self.full_entity_reads.fetch_add(1, Ordering::SeqCst);

        let tables = self.tables.read().await;
        let Some(entity) = tables.find_entity(entity_id) else {
            return Ok(None);
        };

        let episode_name = entity
            .episode_id
            .as_deref()
            .and_then(|id| tables.find_entity(id))
            .map(|episode| episode.name.clone());

        Ok(Some(FullEntity {
            project_name: tables.project_name(&entity.project_id),
            episode_name,
            tasks: tables.tasks_of(entity_id).cloned().collect(),
            entity: entity.clone(),
        }))
    }

    async fn is_assigned(&self, person_id: &str, entity_id: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.is_assigned(person_id, entity_id))
    }

    async fn find_entities(&self, criteria: &Criteria) -> Result<Vec<Entity>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entities
            .iter()
            .filter(|e| tables.matches(criteria, e))
            .cloned()
            .collect())
    }

    async fn find_entities_with_tasks(
        &self,
        criteria: &Criteria,
    ) -> Result<Vec<EntityWithTasks>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entities
            .iter()
            .filter(|e| tables.matches(criteria, e))
            .map(|entity| EntityWithTasks {
                project_name: tables.project_name(&entity.project_id),
                tasks: tables
                    .tasks_of(&entity.id)
                    .filter(|t| criteria.assigned_to().map_or(true, |p| t.is_assigned_to(p)))
                    .cloned()
                    .collect(),
                entity: entity.clone(),
            })
            .collect())
    }

    async fn entities_for_project(
        &self,
        project_id: &str,
        assigned_to: Option<&str>,
    ) -> Result<Vec<Entity>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .entities
            .iter()
            .filter(|e| e.project_id == project_id)
            .filter(|e| assigned_to.map_or(true, |p| tables.is_assigned(p, &e.id)))
            .cloned()
            .collect())
    }

    async fn entities_for_episode(
        &self,
        episode_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        tables
            .entities
            .iter()
            .filter(|e| e.episode_id.as_deref() == Some(episode_id))
            .map(|e| tables.render_entity(e, relations))
            .collect()
    }

    async fn insert_entity(
        &self,
        new_entity: NewEntity,
        author_id: Option<&str>,
    ) -> Result<Entity, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.find_project(&new_entity.project_id).is_none() {
            return Err(StoreError::not_found("Project", new_entity.project_id));
        }

        if let Some(episode_id) = new_entity.episode_id.as_deref() {
            let in_project = tables
                .find_entity(episode_id)
                .is_some_and(|e| e.is_episode() && e.project_id == new_entity.project_id);
            if !in_project {
                return Err(StoreError::not_found("Episode", episode_id));
            }
        }

        let now = Utc::now();
        let entity = Entity {
            id: Uuid::new_v4().to_string(),
            name: new_entity.name,
            description: new_entity.description,
            project_id: new_entity.project_id,
            kind: new_entity.kind,
            parent_id: None,
            episode_id: new_entity.episode_id,
            data: new_entity.data,
            canceled: false,
            created_at: now,
            updated_at: now,
        };

        tables.versions.push(EntityVersion {
            id: Uuid::new_v4().to_string(),
            entity_id: entity.id.clone(),
            name: entity.name.clone(),
            data: entity.data.clone(),
            person_id: author_id.map(str::to_string),
            created_at: now,
        });
        tables.entities.push(entity.clone());
        self.mutations.fetch_add(1, Ordering::SeqCst);

        debug!(entity_id = %entity.id, project_id = %entity.project_id, "Created entity");
        Ok(entity)
    }

    async fn delete_entity(&self, entity_id: &str, force: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let Some(index) = tables.entities.iter().position(|e| e.id == entity_id) else {
            return Err(StoreError::not_found("Entity", entity_id));
        };

        let task_ids: HashSet<String> = tables.tasks_of(entity_id).map(|t| t.id.clone()).collect();
        let preview_count = tables
            .preview_files
            .iter()
            .filter(|p| task_ids.contains(&p.task_id))
            .count();
        let child_count = tables
            .entities
            .iter()
            .filter(|e| {
                e.parent_id.as_deref() == Some(entity_id)
                    || e.episode_id.as_deref() == Some(entity_id)
            })
            .count();

        let dependents = task_ids.len() + preview_count + child_count;
        if dependents > 0 && !force {
            return Err(StoreError::HasDependents {
                id: entity_id.to_string(),
                count: dependents,
            });
        }

        tables.preview_files.retain(|p| !task_ids.contains(&p.task_id));
        tables.tasks.retain(|t| t.entity_id != entity_id);
        tables.versions.retain(|v| v.entity_id != entity_id);
        for child in tables.entities.iter_mut() {
            if child.parent_id.as_deref() == Some(entity_id) {
                child.parent_id = None;
            }
            if child.episode_id.as_deref() == Some(entity_id) {
                child.episode_id = None;
            }
        }
        tables.entities.remove(index);
        self.mutations.fetch_add(1, Ordering::SeqCst);

        debug!(entity_id, force, dependents, "Removed entity");
        Ok(())
    }

    async fn entity_versions(&self, entity_id: &str) -> Result<Vec<EntityVersion>, StoreError> {
        let tables = self.tables.read().await;
        let mut versions: Vec<EntityVersion> = tables
            .versions
            .iter()
            .filter(|v| v.entity_id == entity_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(versions)
    }

    async fn task_types_for_entity(&self, entity_id: &str) -> Result<Vec<TaskType>, StoreError> {
        let tables = self.tables.read().await;
        let used: HashSet<&str> = tables
            .tasks_of(entity_id)
            .map(|t| t.task_type_id.as_str())
            .collect();

        let mut task_types: Vec<TaskType> = tables
            .task_types
            .iter()
            .filter(|t| used.contains(t.id.as_str()))
            .cloned()
            .collect();
        task_types.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(task_types)
    }

    async fn tasks_for_entity(
        &self,
        entity_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        tables
            .tasks_of(entity_id)
            .map(|t| tables.render_task(t, relations))
            .collect()
    }

    async fn tasks_for_episode(
        &self,
        episode_id: &str,
        relations: Relations,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let entity_ids: HashSet<&str> = tables
            .entities
            .iter()
            .filter(|e| e.episode_id.as_deref() == Some(episode_id))
            .map(|e| e.id.as_str())
            .collect();

        tables
            .tasks
            .iter()
            .filter(|t| entity_ids.contains(t.entity_id.as_str()))
            .map(|t| tables.render_task(t, relations))
            .collect()
    }

    async fn preview_files_for_entity(
        &self,
        entity_id: &str,
    ) -> Result<BTreeMap<String, Vec<PreviewFile>>, StoreError> {
        let tables = self.tables.read().await;
        let task_ids: HashSet<&str> = tables.tasks_of(entity_id).map(|t| t.id.as_str()).collect();

        let mut grouped: BTreeMap<String, Vec<PreviewFile>> = BTreeMap::new();
        for preview in tables
            .preview_files
            .iter()
            .filter(|p| task_ids.contains(p.task_id.as_str()))
        {
            grouped
                .entry(preview.task_type_id.clone())
                .or_default()
                .push(preview.clone());
        }
        Ok(grouped)
    }
}

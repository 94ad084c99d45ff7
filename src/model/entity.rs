use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::Task;

/// Kind of production item an entity represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Asset,
    Shot,
    Sequence,
    Episode,
    Edit,
    Concept,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Asset,
        EntityKind::Shot,
        EntityKind::Sequence,
        EntityKind::Episode,
        EntityKind::Edit,
        EntityKind::Concept,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Asset => "asset",
            EntityKind::Shot => "shot",
            EntityKind::Sequence => "sequence",
            EntityKind::Episode => "episode",
            EntityKind::Edit => "edit",
            EntityKind::Concept => "concept",
        }
    }

    /// Parse a kind name, ignoring ASCII case.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }
}

/// A tracked production item belonging to exactly one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub project_id: String,

    #[serde(default)]
    pub kind: EntityKind,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub episode_id: Option<String>,

    /// Open-ended structured payload
    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub canceled: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn is_episode(&self) -> bool {
        self.kind == EntityKind::Episode
    }
}

/// Fields accepted when creating an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub data: Map<String, Value>,
    pub episode_id: Option<String>,
    pub kind: EntityKind,
}

/// Denormalized view of an entity, as served by the single-entity route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullEntity {
    #[serde(flatten)]
    pub entity: Entity,

    pub project_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_name: Option<String>,

    pub tasks: Vec<Task>,
}

/// Entity joined with its project name and tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityWithTasks {
    #[serde(flatten)]
    pub entity: Entity,

    pub project_name: String,

    pub tasks: Vec<Task>,
}

/// Snapshot of an entity's data at some point in its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityVersion {
    pub id: String,

    pub entity_id: String,

    pub name: String,

    #[serde(default)]
    pub data: Map<String, Value>,

    /// Person who made the change, when known
    #[serde(default)]
    pub person_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

//! Query criteria and relation directives.
//!
//! Criteria are a conjunction of exact-match filters over entity fields,
//! plus two filters that cannot be expressed on the entity row alone:
//! `assigned_to` (a task of the entity is assigned to that person) and the
//! project scope (the entity belongs to one of a set of projects).

use std::collections::BTreeMap;

use crate::error::ValidationError;

use super::entity::{Entity, EntityKind};

/// Entity attributes that can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityField {
    Id,
    Name,
    ProjectId,
    Kind,
    ParentId,
    EpisodeId,
    Canceled,
}

impl EntityField {
    pub const ALL: [EntityField; 7] = [
        EntityField::Id,
        EntityField::Name,
        EntityField::ProjectId,
        EntityField::Kind,
        EntityField::ParentId,
        EntityField::EpisodeId,
        EntityField::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityField::Id => "id",
            EntityField::Name => "name",
            EntityField::ProjectId => "project_id",
            EntityField::Kind => "kind",
            EntityField::ParentId => "parent_id",
            EntityField::EpisodeId => "episode_id",
            EntityField::Canceled => "canceled",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }

    /// Convert a raw query-string value to the type of this field.
    pub fn coerce(&self, raw: &str) -> Result<FilterValue, ValidationError> {
        match self {
            EntityField::Canceled => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(FilterValue::Flag(true)),
                "false" => Ok(FilterValue::Flag(false)),
                _ => Err(ValidationError::invalid(
                    self.as_str(),
                    format!("expected true or false, got '{}'", raw),
                )),
            },
            EntityField::Kind => EntityKind::parse(raw).map(FilterValue::Kind).ok_or_else(|| {
                ValidationError::invalid(self.as_str(), format!("unknown entity kind '{}'", raw))
            }),
            _ => Ok(FilterValue::Text(raw.to_string())),
        }
    }
}

/// A typed filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Flag(bool),
    Kind(EntityKind),
}

impl FilterValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FilterValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Conjunction of exact-match filters used by the listing routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    fields: BTreeMap<EntityField, FilterValue>,
    assigned_to: Option<String>,
    project_scope: Option<Vec<String>>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: EntityField, value: FilterValue) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field filter, replacing any previous value for that field.
    pub fn insert(&mut self, field: EntityField, value: FilterValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: EntityField) -> Option<&FilterValue> {
        self.fields.get(&field)
    }

    pub fn project_id(&self) -> Option<&str> {
        self.get(EntityField::ProjectId).and_then(FilterValue::as_text)
    }

    pub fn assigned_to(&self) -> Option<&str> {
        self.assigned_to.as_deref()
    }

    /// Require a task of each entity to be assigned to `person_id`.
    ///
    /// Overrides any value set earlier, including one supplied by the caller.
    pub fn set_assigned_to(&mut self, person_id: impl Into<String>) {
        self.assigned_to = Some(person_id.into());
    }

    /// Only match entities whose project is one of `project_ids`.
    pub fn restrict_to_projects(&mut self, project_ids: Vec<String>) {
        self.project_scope = Some(project_ids);
    }

    pub fn project_scope(&self) -> Option<&[String]> {
        self.project_scope.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.assigned_to.is_none() && self.project_scope.is_none()
    }

    /// Check the field filters and project scope against an entity.
    ///
    /// `assigned_to` needs task data and is evaluated by the store.
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(scope) = &self.project_scope {
            if !scope.iter().any(|id| *id == entity.project_id) {
                return false;
            }
        }

        self.fields.iter().all(|(field, value)| match (field, value) {
            (EntityField::Id, FilterValue::Text(v)) => entity.id == *v,
            (EntityField::Name, FilterValue::Text(v)) => entity.name == *v,
            (EntityField::ProjectId, FilterValue::Text(v)) => entity.project_id == *v,
            (EntityField::ParentId, FilterValue::Text(v)) => {
                entity.parent_id.as_deref() == Some(v.as_str())
            }
            (EntityField::EpisodeId, FilterValue::Text(v)) => {
                entity.episode_id.as_deref() == Some(v.as_str())
            }
            (EntityField::Kind, FilterValue::Kind(kind)) => entity.kind == *kind,
            (EntityField::Canceled, FilterValue::Flag(flag)) => entity.canceled == *flag,
            _ => false,
        })
    }
}

/// How related records are rendered in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relations {
    /// Relation fields are left out
    #[default]
    Omit,
    /// Related records are referenced by id
    Ids,
    /// Related records are inlined
    Full,
}

impl Relations {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "false" | "0" | "" => Some(Relations::Omit),
            "true" | "1" | "ids" => Some(Relations::Ids),
            "full" => Some(Relations::Full),
            _ => None,
        }
    }
}

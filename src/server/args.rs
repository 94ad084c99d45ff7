//! Request argument extraction.
//!
//! Query strings and create bodies are parsed here into typed values, so a
//! malformed request fails with a [`ValidationError`] naming the offending
//! field before any service call is made.

use std::collections::HashMap;

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::ValidationError;
use crate::model::{Criteria, EntityField, EntityKind, NewEntity, Relations};

/// Query keys that control the response rather than filter it.
pub const RESERVED_QUERY_KEYS: [&str; 3] = ["relations", "page", "limit"];

const ASSIGNED_TO: &str = "assigned_to";

fn query_pairs(query: Option<&str>) -> impl Iterator<Item = (String, String)> + '_ {
    form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
}

fn last_value(query: Option<&str>, key: &str) -> Option<String> {
    query_pairs(query).filter(|(k, _)| k == key).last().map(|(_, v)| v)
}

// =============================================================================
// Query String
// =============================================================================

/// Build listing criteria from a raw query string.
///
/// Every pair except the reserved keys becomes an exact-match filter.
/// When a key repeats, the last value wins.
pub fn parse_criteria(query: Option<&str>) -> Result<Criteria, ValidationError> {
    let mut criteria = Criteria::new();

    for (key, value) in query_pairs(query) {
        if RESERVED_QUERY_KEYS.contains(&key.as_str()) {
            continue;
        }
        if key == ASSIGNED_TO {
            criteria.set_assigned_to(value);
            continue;
        }

        let field = EntityField::parse(&key).ok_or_else(|| ValidationError::unknown(&key))?;
        criteria.insert(field, field.coerce(&value)?);
    }

    Ok(criteria)
}

/// Read the `relations` directive. Absent means [`Relations::Omit`].
pub fn parse_relations(query: Option<&str>) -> Result<Relations, ValidationError> {
    match last_value(query, "relations") {
        None => Ok(Relations::Omit),
        Some(value) => Relations::parse(&value).ok_or_else(|| {
            ValidationError::invalid("relations", "expected true, false or full")
        }),
    }
}

/// Read the `force` flag of a delete request.
pub fn parse_force(query: Option<&str>) -> bool {
    last_value(query, "force")
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

// =============================================================================
// Create Body
// =============================================================================

/// Fields of an entity creation request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CreateEntityArgs {
    pub name: String,
    pub description: String,
    pub data: Map<String, Value>,
    pub episode_id: Option<String>,
}

impl CreateEntityArgs {
    /// Parse a JSON or form-encoded body.
    ///
    /// A missing content type is read as JSON.
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self, ValidationError> {
        let mime = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());

        match mime.as_deref() {
            None | Some("application/json") => Self::from_json(body),
            Some("application/x-www-form-urlencoded") => Self::from_form(body),
            Some(other) => Err(ValidationError::invalid(
                "content-type",
                format!("unsupported content type '{}'", other),
            )),
        }
    }

    fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(body)
                .map_err(|e| ValidationError::invalid("body", format!("invalid JSON: {}", e)))?
        };
        let Value::Object(mut fields) = value else {
            return Err(ValidationError::invalid("body", "expected a JSON object"));
        };

        let name = match fields.remove("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name),
            Some(_) => return Err(ValidationError::invalid("name", "expected a string")),
        };

        let description = match fields.remove("description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(description)) => description,
            Some(_) => return Err(ValidationError::invalid("description", "expected a string")),
        };

        let data = match fields.remove("data") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(data)) => data,
            Some(_) => return Err(ValidationError::invalid("data", "expected a JSON object")),
        };

        let episode_id = match fields.remove("episode_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id),
            Some(_) => return Err(ValidationError::invalid("episode_id", "expected a string")),
        };

        Self::build(name, description, data, episode_id)
    }

    fn from_form(body: &[u8]) -> Result<Self, ValidationError> {
        let mut fields: HashMap<String, String> = form_urlencoded::parse(body)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let data = match fields.remove("data") {
            None => Map::new(),
            Some(raw) if raw.trim().is_empty() => Map::new(),
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(data)) => data,
                _ => {
                    return Err(ValidationError::invalid(
                        "data",
                        "expected a JSON-encoded object",
                    ))
                }
            },
        };

        Self::build(
            fields.remove("name"),
            fields.remove("description").unwrap_or_default(),
            data,
            fields.remove("episode_id"),
        )
    }

    fn build(
        name: Option<String>,
        description: String,
        data: Map<String, Value>,
        episode_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let name = name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ValidationError::missing("name", "Field 'name' is required"))?;

        Ok(Self {
            name,
            description,
            data,
            episode_id: episode_id.filter(|id| !id.is_empty()),
        })
    }

    pub fn into_new_entity(self, project_id: impl Into<String>) -> NewEntity {
        NewEntity {
            project_id: project_id.into(),
            name: self.name,
            description: self.description,
            data: self.data,
            episode_id: self.episode_id,
            kind: EntityKind::Asset,
        }
    }
}

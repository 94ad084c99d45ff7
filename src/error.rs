use thiserror::Error;

/// Errors raised by the entity store and the service facade built on it.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Entity cannot be removed without `force` because records still refer to it
    #[error("Entity {id} has {count} dependent record(s); use force=true to remove it anyway")]
    HasDependents { id: String, count: usize },

    /// Backend failure (fixture loading, serialization, ...)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// A request argument that is missing or has the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: String,

    /// Human-readable description
    pub message: String,
}

impl ValidationError {
    /// A required field was not supplied.
    pub fn missing(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// A field was supplied with a value of the wrong type or shape.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("Invalid value for '{}': {}", field, message.into());
        Self { field, message }
    }

    /// A field name that is not accepted at all.
    pub fn unknown(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("Unknown field '{}'", field);
        Self { field, message }
    }
}

/// The caller is authenticated but not allowed to perform the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Permission denied: {0}")]
pub struct PermissionDenied(pub String);

/// Top-level error for entity requests.
///
/// Every handler returns this; the HTTP mapping lives in `server::handlers`.
#[derive(Debug, Clone, Error)]
pub enum EntityError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Permission(#[from] PermissionDenied),
}

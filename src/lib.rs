//! # Entity API
//!
//! HTTP endpoints for the entities of a production-tracking system: assets,
//! shots, sequences, episodes, edits and concepts, together with the tasks,
//! previews and versions attached to them.
//!
//! ## Features
//!
//! - **Scoped access**: every read and mutation is checked against the
//!   caller's project membership, and vendors only see their assignments
//! - **Filtered listings**: exact-match criteria taken from the query string
//! - **Full-entity cache**: denormalized entity views in an LRU, with a
//!   single invalidate-and-retry on misses
//! - **Authentication**: HMAC-SHA256 signed bearer session tokens
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`model`] - Entity, project, person and task records
//! - [`store`] - Storage trait, in-memory store and the service facade
//! - [`server`] - Axum-based HTTP server, auth and access checks
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types shared by the layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use entity_api::{create_router, EntityService, MemoryStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::load("fixtures.json").expect("fixtures");
//!     let router = create_router(EntityService::new(store), RouterConfig::new("secret"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command, ServeConfig, TokenConfig, TokenOutputFormat};
pub use error::{EntityError, PermissionDenied, StoreError, ValidationError};
pub use model::{
    Caller, Criteria, Entity, EntityField, EntityKind, EntityVersion, EntityWithTasks,
    FilterValue, FullEntity, NewEntity, Person, PreviewFile, Project, Relations, Role, Task,
    TaskType,
};
pub use server::{
    auth_middleware, create_dev_router, create_router, health_handler, AppState, AuthError,
    ErrorResponse, HealthResponse, RouterConfig, SessionAuth,
};
pub use store::{
    EntityCache, EntityService, EntityStore, Fixture, MemoryStore, StoreStats,
    DEFAULT_ENTITY_CACHE_CAPACITY,
};

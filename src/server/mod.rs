//! HTTP server layer for the entity API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           HTTP Layer                            │
//! │              /data/entities, /data/episodes, ...                │
//! │                                                                 │
//! │  ┌────────────┐  ┌─────────────┐  ┌────────────┐  ┌──────────┐  │
//! │  │    auth    │  │    args     │  │   access   │  │ handlers │  │
//! │  │  (tokens)  │  │ (criteria,  │  │ (project,  │  │ (routes) │  │
//! │  │            │  │  bodies)    │  │  vendor)   │  │          │  │
//! │  └────────────┘  └─────────────┘  └────────────┘  └──────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod args;
pub mod auth;
pub mod handlers;
pub mod routes;

pub use access::Access;
pub use args::{parse_criteria, parse_force, parse_relations, CreateEntityArgs};
pub use auth::{auth_middleware, AuthError, SessionAuth, PERSON_ID_HEADER};
pub use handlers::{health_handler, AppState, ErrorResponse, HealthResponse};
pub use routes::{create_dev_router, create_router, RouterConfig};

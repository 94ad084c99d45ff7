//! Test utilities for integration tests.
//!
//! Provides a seeded in-memory store and a [`TestApp`] wrapping the router,
//! with helpers that send authenticated requests and decode JSON responses.
//!
//! Fixture layout:
//!
//! ```text
//! prj "Big Buck" (team: mgr, usr, vnd)
//!   ep1   episode            t4 Layout  [vnd]
//!   hero  asset  (ep1)       t1 Model   [vnd]  pv1, pv3
//!                            t2 Anim    [usr]  pv2
//!   prop  asset
//!   shot1 shot   (ep1)       t3 Anim    [usr]
//! side "Side Project" (team: usr)
//!   far   asset
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use entity_api::{create_router, EntityService, Fixture, MemoryStore, RouterConfig, SessionAuth};

pub const TEST_SECRET: &str = "test-secret-key-for-session-tokens";

/// Person ids in the fixture, one per role under test.
pub const ADMIN: &str = "adm";
pub const MANAGER: &str = "mgr";
pub const USER: &str = "usr";
pub const VENDOR: &str = "vnd";
pub const OUTSIDER: &str = "out";

pub fn fixture() -> Fixture {
    serde_json::from_value(json!({
        "persons": [
            { "id": ADMIN, "first_name": "Ada", "role": "admin" },
            { "id": MANAGER, "first_name": "Max", "role": "manager" },
            { "id": USER, "first_name": "Uma", "role": "user" },
            { "id": VENDOR, "first_name": "Vic", "last_name": "Vendor", "role": "vendor" },
            { "id": OUTSIDER, "first_name": "Oz", "role": "supervisor" }
        ],
        "projects": [
            { "id": "prj", "name": "Big Buck", "team": [MANAGER, USER, VENDOR] },
            { "id": "side", "name": "Side Project", "team": [USER] }
        ],
        "task_types": [
            { "id": "tt-anim", "name": "Animation", "priority": 2 },
            { "id": "tt-model", "name": "Modeling", "priority": 1 }
        ],
        "entities": [
            { "id": "ep1", "name": "E01", "project_id": "prj", "kind": "episode" },
            { "id": "hero", "name": "Hero", "project_id": "prj", "episode_id": "ep1",
              "data": { "height": 180 } },
            { "id": "prop", "name": "Prop", "project_id": "prj" },
            { "id": "shot1", "name": "SH010", "project_id": "prj", "kind": "shot",
              "episode_id": "ep1" },
            { "id": "far", "name": "Far", "project_id": "side" }
        ],
        "tasks": [
            { "id": "t1", "name": "Model", "entity_id": "hero", "project_id": "prj",
              "task_type_id": "tt-model", "assignees": [VENDOR] },
            { "id": "t2", "name": "Anim", "entity_id": "hero", "project_id": "prj",
              "task_type_id": "tt-anim", "assignees": [USER] },
            { "id": "t3", "name": "Anim", "entity_id": "shot1", "project_id": "prj",
              "task_type_id": "tt-anim", "assignees": [USER] },
            { "id": "t4", "name": "Layout", "entity_id": "ep1", "project_id": "prj",
              "task_type_id": "tt-model", "assignees": [VENDOR] }
        ],
        "preview_files": [
            { "id": "pv1", "name": "model v1", "task_id": "t1", "task_type_id": "tt-model",
              "revision": 1, "extension": "png" },
            { "id": "pv2", "name": "anim v1", "task_id": "t2", "task_type_id": "tt-anim",
              "revision": 1, "extension": "mp4" },
            { "id": "pv3", "name": "model v2", "task_id": "t1", "task_type_id": "tt-model",
              "revision": 2, "extension": "png" }
        ]
    }))
    .unwrap()
}

/// Issue a valid session token for a person.
pub fn token(person_id: &str) -> String {
    SessionAuth::new(TEST_SECRET)
        .issue(person_id, Duration::from_secs(3600))
        .0
}

/// Router over the fixture store, with authentication enabled.
pub struct TestApp {
    pub router: Router,
    pub service: Arc<EntityService<MemoryStore>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::new(TEST_SECRET).with_tracing(false))
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let service = Arc::new(EntityService::new(MemoryStore::from_fixture(fixture())));
        let router = create_router(Arc::clone(&service), config);
        Self { router, service }
    }

    pub fn store(&self) -> &MemoryStore {
        self.service.store()
    }

    /// Send a request and decode the body as JSON (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, person_id: &str) -> (StatusCode, Value) {
        self.send(authed(Method::GET, uri, person_id).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str, person_id: &str) -> (StatusCode, Value) {
        self.send(
            authed(Method::DELETE, uri, person_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, person_id: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            authed(Method::POST, uri, person_id)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&self, uri: &str, person_id: &str, body: &str) -> (StatusCode, Value) {
        self.send(
            authed(Method::POST, uri, person_id)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Request builder carrying a bearer token for `person_id`.
pub fn authed(method: Method, uri: &str, person_id: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token(person_id)))
}

/// Ids of the records in a JSON array response, sorted.
pub fn ids(value: &Value) -> Vec<String> {
    let mut ids: Vec<String> = value
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|item| item["id"].as_str().unwrap_or_default().to_string())
        .collect();
    ids.sort();
    ids
}

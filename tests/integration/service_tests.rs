//! Tests against a server bound to a real socket.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use entity_api::{create_router, EntityService, MemoryStore, RouterConfig};

use super::test_utils::{fixture, token, TEST_SECRET, MANAGER, USER};

async fn spawn_server() -> SocketAddr {
    let service = Arc::new(EntityService::new(MemoryStore::from_fixture(fixture())));
    let router = create_router(service, RouterConfig::new(TEST_SECRET).with_tracing(false));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_health_over_http() {
    let addr = spawn_server().await;

    let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_then_fetch_over_http() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{}/data/projects/prj/entities", addr))
        .bearer_auth(token(MANAGER))
        .json(&json!({ "name": "Tree" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();

    let response = client
        .get(format!(
            "http://{}/data/entities/{}",
            addr,
            created["id"].as_str().unwrap()
        ))
        .bearer_auth(token(USER))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entity: Value = response.json().await.unwrap();
    assert_eq!(entity["name"], "Tree");
    assert_eq!(entity["project_name"], "Big Buck");
}

#[tokio::test]
async fn test_cors_preflight() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("http://{}/data/entities", addr),
        )
        .header("Origin", "https://tracker.example.com")
        .header("Access-Control-Request-Method", "DELETE")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

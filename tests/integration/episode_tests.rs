//! Episode sub-resource tests.

use axum::http::StatusCode;
use serde_json::json;

use super::test_utils::{ids, TestApp, MANAGER, OUTSIDER, USER, VENDOR};

#[tokio::test]
async fn test_episode_entities() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/episodes/ep1/entities", USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["hero", "shot1"]);
    assert!(body[0].get("tasks").is_none());
}

#[tokio::test]
async fn test_episode_entities_with_task_ids() {
    let app = TestApp::new();

    let (status, body) = app
        .get("/data/episodes/ep1/entities?relations=true", USER)
        .await;
    assert_eq!(status, StatusCode::OK);

    let hero = body
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == "hero")
        .unwrap();
    assert_eq!(hero["tasks"], json!(["t1", "t2"]));
}

#[tokio::test]
async fn test_episode_entities_with_full_tasks() {
    let app = TestApp::new();

    let (_, body) = app
        .get("/data/episodes/ep1/entities?relations=full", USER)
        .await;
    let shot = body
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == "shot1")
        .unwrap();
    assert_eq!(shot["tasks"][0]["id"], "t3");
    assert_eq!(shot["tasks"][0]["assignees"], json!([USER]));
}

#[tokio::test]
async fn test_episode_entity_tasks() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/episodes/ep1/entity-tasks", USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["t1", "t2", "t3"]);

    let (_, body) = app
        .get("/data/episodes/ep1/entity-tasks?relations=full", MANAGER)
        .await;
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|task| task["task_type"].is_object()));
}

#[tokio::test]
async fn test_episode_entity_tasks_denied_to_vendors() {
    let app = TestApp::new();

    // The vendor is assigned to the episode itself, which is not enough
    let (status, _) = app.get("/data/episodes/ep1/entities", VENDOR).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/data/episodes/ep1/entity-tasks", VENDOR).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");
}

#[tokio::test]
async fn test_episode_routes_require_project_access() {
    let app = TestApp::new();

    let (status, _) = app.get("/data/episodes/ep1/entities", OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/data/episodes/ep1/entity-tasks", OUTSIDER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_non_episode_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/episodes/hero/entities", USER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = app.get("/data/episodes/ghost/entity-tasks", USER).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

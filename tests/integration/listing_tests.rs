//! Filtered entity listing tests.

use axum::http::StatusCode;

use super::test_utils::{ids, TestApp, ADMIN, MANAGER, OUTSIDER, USER, VENDOR};

#[tokio::test]
async fn test_listing_filters_by_field() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/entities?kind=shot", USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["shot1"]);

    let (_, body) = app
        .get("/data/entities?project_id=prj&episode_id=ep1", USER)
        .await;
    assert_eq!(ids(&body), vec!["hero", "shot1"]);

    let (_, body) = app.get("/data/entities?name=Prop&relations=true", USER).await;
    assert_eq!(ids(&body), vec!["prop"]);

    let (_, body) = app.get("/data/entities?canceled=true", USER).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_listing_rejects_unknown_filter() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/entities?colour=red", USER).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("colour"));

    let (status, _) = app.get("/data/entities?canceled=perhaps", USER).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_is_scoped_to_caller_projects() {
    let app = TestApp::new();

    let (_, body) = app.get("/data/entities", USER).await;
    assert_eq!(ids(&body), vec!["ep1", "far", "hero", "prop", "shot1"]);

    let (_, body) = app.get("/data/entities", MANAGER).await;
    assert_eq!(ids(&body), vec!["ep1", "hero", "prop", "shot1"]);

    let (status, body) = app.get("/data/entities", OUTSIDER).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (_, body) = app.get("/data/entities", ADMIN).await;
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_listing_of_foreign_project_is_denied() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/entities?project_id=side", MANAGER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");

    let (status, _) = app.get("/data/entities?project_id=side", VENDOR).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/data/entities?project_id=nope", ADMIN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vendor_assignment_filter_is_forced() {
    let app = TestApp::new();

    let (_, body) = app.get("/data/entities", VENDOR).await;
    assert_eq!(ids(&body), vec!["ep1", "hero"]);

    // Naming someone else does not widen the result
    let (_, body) = app.get("/data/entities?assigned_to=usr", VENDOR).await;
    assert_eq!(ids(&body), vec!["ep1", "hero"]);
}

#[tokio::test]
async fn test_assigned_to_filter() {
    let app = TestApp::new();

    let (_, body) = app.get("/data/entities?assigned_to=usr", MANAGER).await;
    assert_eq!(ids(&body), vec!["hero", "shot1"]);
}

#[tokio::test]
async fn test_all_route_matches_listing() {
    let app = TestApp::new();

    let (status, all) = app.get("/data/entities/all?kind=asset", USER).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listing) = app.get("/data/entities?kind=asset", USER).await;
    assert_eq!(all, listing);
    assert_eq!(ids(&all), vec!["far", "hero", "prop"]);
}

#[tokio::test]
async fn test_with_tasks_listing() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/entities/with-tasks?project_id=prj", USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["ep1", "hero", "prop", "shot1"]);

    let hero = body
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == "hero")
        .unwrap();
    assert_eq!(hero["project_name"], "Big Buck");
    assert_eq!(ids(&hero["tasks"]), vec!["t1", "t2"]);
}

#[tokio::test]
async fn test_with_tasks_listing_for_vendor_keeps_own_tasks() {
    let app = TestApp::new();

    let (status, body) = app.get("/data/entities/with-tasks?kind=asset", VENDOR).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["hero"]);
    assert_eq!(ids(&body[0]["tasks"]), vec!["t1"]);
}

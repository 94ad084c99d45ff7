//! Authentication integration tests.
//!
//! Tests verify:
//! - Valid session tokens work
//! - Expired tokens are rejected
//! - Forged and malformed tokens are rejected
//! - Missing credentials are handled
//! - The development router trusts `X-Person-Id`

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use entity_api::{create_dev_router, EntityService, MemoryStore, SessionAuth};

use super::test_utils::{fixture, token, TestApp, TEST_SECRET, USER};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn bearer(uri: &str, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, value)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Valid Tokens
// =============================================================================

#[tokio::test]
async fn test_valid_token_succeeds() {
    let app = TestApp::new();

    let (status, body) = app
        .send(bearer("/data/entities/hero", &format!("Bearer {}", token(USER))))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "hero");
}

#[tokio::test]
async fn test_bearer_scheme_is_case_insensitive() {
    let app = TestApp::new();

    let (status, _) = app
        .send(bearer("/data/entities", &format!("bearer {}", token(USER))))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

// =============================================================================
// Rejected Credentials
// =============================================================================

#[tokio::test]
async fn test_missing_token() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/data/entities")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_wrong_scheme() {
    let app = TestApp::new();

    let (status, body) = app
        .send(bearer("/data/entities", "Basic dXNyOnB3"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_malformed_token() {
    let app = TestApp::new();

    let (status, body) = app.send(bearer("/data/entities", "Bearer garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_expired_token() {
    let app = TestApp::new();
    let expired = SessionAuth::new(TEST_SECRET).issue_with_expiry(USER, now() - 60);

    let (status, body) = app
        .send(bearer("/data/entities", &format!("Bearer {}", expired)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let app = TestApp::new();
    let (forged, _) = SessionAuth::new("another-secret").issue(USER, Duration::from_secs(3600));

    let (status, body) = app
        .send(bearer("/data/entities", &format!("Bearer {}", forged)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_signature");
}

#[tokio::test]
async fn test_token_for_other_person_is_not_reusable() {
    let app = TestApp::new();

    // Swap the person id while keeping the signature
    let original = token(USER);
    let tampered = original.replacen(USER, "adm", 1);

    let (status, body) = app
        .send(bearer("/data/entities", &format!("Bearer {}", tampered)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_signature");
}

#[tokio::test]
async fn test_unknown_person() {
    let app = TestApp::new();

    let (status, body) = app
        .send(bearer("/data/entities", &format!("Bearer {}", token("ghost"))))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unknown_person");
}

// =============================================================================
// Development Router
// =============================================================================

#[tokio::test]
async fn test_dev_router_uses_person_header() {
    let service = Arc::new(EntityService::new(MemoryStore::from_fixture(fixture())));
    let router = create_dev_router(service);

    let request = Request::builder()
        .uri("/data/entities/hero")
        .header("X-Person-Id", USER)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Header is still required to establish the caller
    let request = Request::builder()
        .uri("/data/entities/hero")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// tests/api_http.rs
//
// HTTP-level tests for the router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - admin gate on /api (missing, unknown, non-admin, query token)
// - envelope shape for 404 and 400

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use common::{test_app, EDITOR};

#[tokio::test]
async fn health_returns_ok_without_auth() {
    let app = test_app();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = test_app();
    let req = Request::builder().uri("/api/zones").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "authentication required");
}

#[tokio::test]
async fn unknown_token_is_unauthorized() {
    let app = test_app();
    let req = Request::builder()
        .uri("/api/zones")
        .header(header::AUTHORIZATION, "Bearer who-knows")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_is_forbidden() {
    let app = test_app();
    let req = Request::builder()
        .uri("/api/zones")
        .header(header::AUTHORIZATION, format!("Bearer {EDITOR}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "admin role required");
}

#[tokio::test]
async fn access_token_query_parameter_is_accepted() {
    let app = test_app();
    let req = Request::builder()
        .uri(format!("/api/zones?access_token={}", common::ADMIN))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn encoded_access_token_is_decoded() {
    let app = test_app();
    app.backend.add_user(
        "tok+en/1==",
        museum_dashboard::auth::User::with_role("u-enc", museum_dashboard::auth::ADMIN_ROLE),
    );
    let req = Request::builder()
        .uri("/api/zones?access_token=tok%2Ben%2F1%3D%3D")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn missing_entity_is_404_envelope() {
    let app = test_app();
    let (status, body) = app.get("/api/zones/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "zone not found"}));
}

#[tokio::test]
async fn malformed_json_is_400_envelope() {
    let app = test_app();
    let req = common::authed("POST", "/api/zones")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn store_outage_is_generic_500() {
    let app = test_app();
    app.backend.fail_next(1);
    let (status, body) = app.get("/api/zones").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "error while listing zones");
    assert!(!body.to_string().contains("simulated outage"));
}

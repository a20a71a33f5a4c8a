// tests/api_activities.rs
//
// Activity list/create endpoints and the feed endpoints backed by the
// synchronizer.

mod common;

use axum::http::{header, StatusCode};
use serde_json::json;

use common::test_app;

#[tokio::test]
async fn create_then_list_returns_event_shape() {
    let app = test_app();
    let (status, body) = app
        .json(
            "POST",
            "/api/activities",
            json!({
                "kind": "ticket",
                "title": "School group arrived",
                "description": "32 pupils",
                "priority": "High",
                "icon": "users",
                "color": "#ffaa00"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let id = body["actividadId"].as_str().expect("id").to_string();

    let (status, body) = app.get("/api/activities").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert!(body["timestamp"].is_string());

    let ev = &body["actividades"][0];
    assert_eq!(ev["id"], id.as_str());
    assert_eq!(ev["kind"], "visit");
    assert_eq!(ev["priority"], "high");
    assert_eq!(ev["isRecent"], true);
    assert_eq!(ev["sourceMetadata"]["icon"], "users");
    assert_eq!(ev["sourceMetadata"]["color"], "#ffaa00");
}

#[tokio::test]
async fn create_requires_title() {
    let app = test_app();
    let (status, body) = app
        .json("POST", "/api/activities", json!({"kind": "news", "title": "   "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "title is required");
    assert_eq!(app.backend.row_count("activities"), 0);
}

#[tokio::test]
async fn create_rejects_unknown_priority() {
    let app = test_app();
    let (status, _) = app
        .json("POST", "/api/activities", json!({"title": "x", "priority": "urgent"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_filters_and_drops_malformed_rows() {
    let app = test_app();
    let rows = vec![
        json!({"id": "a", "kind": "news", "title": "A", "created_at": "2026-01-01T10:00:00Z", "priority": "low"}),
        json!({"id": "b", "kind": "show", "title": "B", "created_at": "2026-01-01T11:00:00Z"}),
        json!({"id": "c", "kind": "news", "title": "broken", "created_at": "not-a-date"}),
    ];
    app.backend.seed(
        "activities",
        rows.into_iter().filter_map(|v| v.as_object().cloned()).collect(),
    );

    let (_, body) = app.get("/api/activities").await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["actividades"][0]["id"], "b");

    let (_, body) = app.get("/api/activities?kind=news").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["actividades"][0]["id"], "a");

    let (_, body) = app.get("/api/activities?priority=low&limit=1").await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn kind_filter_accepts_the_same_aliases_as_create() {
    let app = test_app();
    let (status, body) = app
        .json("POST", "/api/activities", json!({"kind": "ticket", "title": "Group booking"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    app.json("POST", "/api/activities", json!({"kind": "zone", "title": "Atrium opened"}))
        .await;

    let (_, body) = app.get("/api/activities?kind=ticket").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["actividades"][0]["kind"], "visit");

    // categories with no alias land in content
    let (_, body) = app.get("/api/activities?kind=zone").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["actividades"][0]["title"], "Atrium opened");

    let (_, body) = app.get("/api/activities?kind=%20").await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn list_outage_is_500() {
    let app = test_app();
    app.backend.fail_next(1);
    let (status, body) = app.get("/api/activities").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"success": false, "error": "error while listing activities"}));
}

#[tokio::test]
async fn feed_refresh_pulls_public_activities() {
    let app = test_app();
    let (_, feed) = app.get("/api/activities/feed").await;
    assert_eq!(feed["data"]["total"], 0);
    assert_eq!(feed["data"]["connection"], "historical");

    app.json("POST", "/api/activities", json!({"title": "Zone reopened"}))
        .await;

    let (status, body) = app.empty("POST", "/api/activities/feed/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "fetched");
    assert_eq!(body["data"]["feed"]["events"][0]["title"], "Zone reopened");

    // within the debounce window
    let (_, body) = app.empty("POST", "/api/activities/feed/refresh").await;
    assert_eq!(body["data"]["outcome"], "debounced");

    let (_, body) = app
        .empty("POST", "/api/activities/feed/refresh?force=true")
        .await;
    assert_eq!(body["data"]["outcome"], "fetched");
}

#[tokio::test]
async fn failed_refresh_exposes_dismissible_warning() {
    let app = test_app();
    app.backend.fail_next(1);

    let (status, body) = app.empty("POST", "/api/activities/feed/refresh").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "error while refreshing the activity feed");
    assert!(body["data"]["warning"].is_string());
    assert!(!body.to_string().contains("simulated outage"));

    let (status, body) = app
        .empty("POST", "/api/activities/feed/dismiss-warning")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "warning dismissed");

    let (_, feed) = app.get("/api/activities/feed").await;
    assert!(feed["data"]["warning"].is_null());
}

#[tokio::test]
async fn stream_is_server_sent_events() {
    let app = test_app();
    let resp = tower::ServiceExt::oneshot(
        app.router.clone(),
        common::authed("GET", "/api/activities/stream")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(ct.starts_with("text/event-stream"));
}

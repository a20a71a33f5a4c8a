// tests/common/mod.rs
//
// Shared helpers: an in-memory app with one admin and one non-admin session,
// plus request builders for JSON and multipart bodies.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use museum_dashboard::activity::MemorySnapshotCache;
use museum_dashboard::auth::User;
use museum_dashboard::config::FeedConfig;
use museum_dashboard::store::{MemoryBackend, Store};
use museum_dashboard::{app_with, router, AppState};

pub const ADMIN: &str = "admin-token";
pub const EDITOR: &str = "editor-token";
pub const BOUNDARY: &str = "museum-test-boundary";

const BODY_LIMIT: usize = 1024 * 1024;

pub struct TestApp {
    pub backend: Arc<MemoryBackend>,
    pub state: AppState,
    pub router: Router,
}

pub fn test_app() -> TestApp {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_user(ADMIN, User::with_role("u-admin", "admin"))
            .with_user(EDITOR, User::with_role("u-editor", "editor")),
    );
    let store = Store::new(backend.clone());
    let state = app_with(store, Arc::new(MemorySnapshotCache::new()), FeedConfig::default());
    TestApp {
        router: router(state.clone()),
        backend,
        state,
    }
}

impl TestApp {
    /// Response status plus body parsed as JSON (non-JSON bodies become a string).
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Json) {
        let resp = self.router.clone().oneshot(req).await.expect("oneshot");
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
            .await
            .expect("read body");
        let json = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Json::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Json) {
        self.send(authed("GET", uri).body(Body::empty()).unwrap()).await
    }

    pub async fn json(&self, method: &str, uri: &str, payload: Json) -> (StatusCode, Json) {
        self.send(json_request(method, uri, &payload)).await
    }

    pub async fn empty(&self, method: &str, uri: &str) -> (StatusCode, Json) {
        self.send(authed(method, uri).body(Body::empty()).unwrap()).await
    }
}

pub fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN}"))
}

pub fn json_request(method: &str, uri: &str, payload: &Json) -> Request<Body> {
    authed(method, uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serialize payload")))
        .expect("build request")
}

/// `image` is `(file_name, content_type, bytes)`.
pub fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    authed(method, uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build multipart request")
}

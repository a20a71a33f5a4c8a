// src/api/mod.rs
//! HTTP surface. Everything under `/api` requires an admin session.

pub mod activities;
pub mod dashboard;
pub mod envelope;
pub mod extract;
pub mod news;
pub mod reviews;
pub mod schedules;
pub mod zones;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::activity::{FeedRuntime, FeedSynchronizer};
use crate::auth::require_admin;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub feed: Arc<FeedSynchronizer>,
    /// Keeps the background feed tasks alive as long as the router is.
    pub runtime: Option<Arc<FeedRuntime>>,
}

impl AppState {
    pub fn new(store: Store, feed: Arc<FeedSynchronizer>) -> Self {
        Self {
            store,
            feed,
            runtime: None,
        }
    }

    pub fn with_runtime(mut self, runtime: FeedRuntime) -> Self {
        self.runtime = Some(Arc::new(runtime));
        self
    }
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/activities", get(activities::list).post(activities::create))
        .route("/activities/feed", get(activities::feed))
        .route("/activities/feed/refresh", post(activities::refresh))
        .route("/activities/feed/dismiss-warning", post(activities::dismiss_warning))
        .route("/activities/stream", get(activities::stream))
        .route("/zones", get(zones::list).post(zones::create))
        .route(
            "/zones/{id}",
            get(zones::get_one)
                .put(zones::replace)
                .patch(zones::toggle)
                .delete(zones::delete),
        )
        .route("/schedules", get(schedules::list).post(schedules::create))
        .route(
            "/schedules/{id}",
            get(schedules::get_one)
                .put(schedules::replace)
                .patch(schedules::toggle)
                .delete(schedules::delete),
        )
        .route("/news", get(news::list).post(news::create))
        .route(
            "/news/{id}",
            get(news::get_one)
                .put(news::replace)
                .patch(news::toggle)
                .delete(news::delete),
        )
        .route("/reviews", get(reviews::list).post(reviews::create))
        .route(
            "/reviews/{id}",
            get(reviews::get_one)
                .put(reviews::replace)
                .patch(reviews::toggle)
                .delete(reviews::delete),
        )
        .route("/dashboard/visitors", get(dashboard::visitors))
        .route("/dashboard/popular", get(dashboard::popular))
        .route("/dashboard/kpis", get(dashboard::kpis))
        .route("/visits", post(dashboard::record_visit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", admin)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Best-effort activity row for an admin action; the action itself has
/// already succeeded, so failures are only logged.
pub(crate) async fn record_activity(store: &Store, activity: crate::store::activities::NewActivity) {
    if let Err(e) = store.activities().create(&activity).await {
        tracing::warn!(target: "api", kind = %activity.kind, error = %e, "could not record activity");
    }
}

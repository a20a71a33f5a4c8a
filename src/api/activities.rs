// src/api/activities.rs
use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;

use crate::activity::realtime::is_public_activity;
use crate::activity::{ActivityEvent, EventKind, FeedStatus, Priority, RefreshOutcome};
use crate::api::envelope::ApiResponse;
use crate::api::extract::{FormInput, QueryParams};
use crate::api::AppState;
use crate::error::AppError;
use crate::store::activities::{ActivityFilter, NewActivity};
use crate::validation;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub kind: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityList {
    pub success: bool,
    pub actividades: Vec<ActivityEvent>,
    pub total: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCreated {
    pub success: bool,
    pub actividad_id: String,
}

/// GET /api/activities
pub async fn list(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<ListParams>,
) -> Result<Json<ActivityList>, AppError> {
    let filter = ActivityFilter {
        limit: Some(p.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)),
        // Stored kinds are canonical, so raw categories are collapsed first.
        kind: p
            .kind
            .filter(|k| !k.trim().is_empty())
            .map(|k| EventKind::from_upstream(&k).as_str().to_string()),
        priority: p.priority.filter(|k| !k.trim().is_empty()),
    };
    let rows = state
        .store
        .activities()
        .list(&filter)
        .await
        .map_err(AppError::upstream("listing activities"))?;

    let now = Utc::now();
    let window = state.feed.config().recency_window();
    let actividades: Vec<ActivityEvent> = rows
        .iter()
        .filter_map(|row| match ActivityEvent::from_row(row) {
            Ok(ev) => Some(ev.with_recency(now, window)),
            Err(e) => {
                tracing::warn!(target: "api", error = %e, "skipping malformed activity row");
                None
            }
        })
        .collect();

    Ok(Json(ActivityList {
        success: true,
        total: actividades.len(),
        actividades,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// POST /api/activities
pub async fn create(State(state): State<AppState>, input: FormInput) -> Result<Json<ActivityCreated>, AppError> {
    let title = validation::required_text("title", input.text("title"), None)?;
    let description = validation::optional_text(input.text("description")).unwrap_or_default();
    let kind = input
        .text("kind")
        .map_or(EventKind::Content, EventKind::from_upstream);

    let priority = match validation::optional_text(input.text("priority")) {
        None => None,
        Some(raw) => match Priority::parse(&raw) {
            Some(_) => Some(raw.to_ascii_lowercase()),
            None => {
                return Err(AppError::validation(
                    "priority must be one of critical, high, medium, low",
                ))
            }
        },
    };

    let mut activity = NewActivity::new(kind.as_str(), title, description);
    activity.priority = priority;
    for key in ["category", "icon", "color"] {
        if let Some(v) = validation::optional_text(input.text(key)) {
            activity.metadata.insert(key.to_string(), Value::String(v));
        }
    }

    let row = state
        .store
        .activities()
        .create(&activity)
        .await
        .map_err(AppError::upstream("creating the activity"))?;
    let id = match row.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    Ok(Json(ActivityCreated {
        success: true,
        actividad_id: id,
    }))
}

/// GET /api/activities/feed
pub async fn feed(State(state): State<AppState>) -> ApiResponse<FeedStatus> {
    ApiResponse::ok(state.feed.status())
}

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    pub force: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct Refreshed {
    pub outcome: RefreshOutcome,
    pub feed: FeedStatus,
}

/// POST /api/activities/feed/refresh
///
/// A failed refresh still returns the last known feed alongside the error.
pub async fn refresh(State(state): State<AppState>, QueryParams(p): QueryParams<RefreshParams>) -> Response {
    match state.feed.refresh(p.force.unwrap_or(false)).await {
        Ok(outcome) => ApiResponse::ok(Refreshed {
            outcome,
            feed: state.feed.status(),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(target: "api", error = %e, "manual feed refresh failed");
            let body = json!({
                "success": false,
                "error": "error while refreshing the activity feed",
                "data": state.feed.status(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// POST /api/activities/feed/dismiss-warning
pub async fn dismiss_warning(State(state): State<AppState>) -> ApiResponse<()> {
    state.feed.dismiss_warning();
    ApiResponse::done("warning dismissed")
}

/// GET /api/activities/stream
pub async fn stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let window = state.feed.config().recency_window();
    let events = BroadcastStream::new(state.store.subscribe_inserts()).filter_map(move |item| async move {
        let inserted = item.ok().filter(is_public_activity)?;
        let event = ActivityEvent::from_row(&inserted.row)
            .ok()?
            .with_recency(Utc::now(), window);
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().event("activity").data(json)))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

// src/api/schedules.rs
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

use crate::api::envelope::ApiResponse;
use crate::api::extract::{toggle_value, FormInput, QueryParams};
use crate::api::{record_activity, AppState};
use crate::error::AppError;
use crate::store::activities::NewActivity;
use crate::store::schedules::{Schedule, ScheduleFields, ScheduleFilter};
use crate::validation;

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub zone_id: Option<String>,
    pub day_of_week: Option<u8>,
    pub active: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<ListParams>,
) -> Result<ApiResponse<Vec<Schedule>>, AppError> {
    if p.day_of_week.is_some_and(|d| d > 6) {
        return Err(AppError::validation("day_of_week must be between 0 and 6"));
    }
    let filter = ScheduleFilter {
        zone_id: p.zone_id,
        day_of_week: p.day_of_week,
        active: p.active,
        limit: p.limit,
        offset: p.offset,
    };
    let rows = state
        .store
        .schedules()
        .list(&filter)
        .await
        .map_err(AppError::upstream("listing schedules"))?;
    Ok(ApiResponse::ok(rows))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Schedule>, AppError> {
    let schedule = state
        .store
        .schedules()
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the schedule"))?
        .ok_or(AppError::not_found("schedule"))?;
    Ok(ApiResponse::ok(schedule))
}

async fn schedule_fields(state: &AppState, input: &FormInput) -> Result<ScheduleFields, AppError> {
    let title = validation::required_text("title", input.text("title"), None)?;
    let day_of_week = validation::day_of_week(input.int("day_of_week")?)?;
    let (start_time, end_time) = validation::time_range(input.text("start_time"), input.text("end_time"))?;
    let capacity = validation::capacity(input.int("capacity")?)?;
    let active = input.flag("active")?.unwrap_or(true);

    let zone_id = validation::optional_text(input.text("zone_id"));
    if let Some(zone_id) = &zone_id {
        let exists = state
            .store
            .zones()
            .get(zone_id)
            .await
            .map_err(AppError::upstream("loading the zone"))?
            .is_some();
        if !exists {
            return Err(AppError::validation("zone_id does not match any zone"));
        }
    }

    Ok(ScheduleFields {
        title,
        zone_id,
        day_of_week,
        start_time,
        end_time,
        capacity,
        active,
    })
}

pub async fn create(State(state): State<AppState>, input: FormInput) -> Result<ApiResponse<Schedule>, AppError> {
    let fields = schedule_fields(&state, &input).await?;
    let schedule = state
        .store
        .schedules()
        .create(&fields)
        .await
        .map_err(AppError::upstream("creating the schedule"))?;
    tracing::info!(target: "api", schedule_id = %schedule.id, "schedule created");

    let day = WEEKDAYS[usize::from(schedule.day_of_week) % WEEKDAYS.len()];
    let mut activity = NewActivity::new(
        "show",
        format!("New show scheduled: {}", schedule.title),
        format!("{day} {}-{}", schedule.start_time, schedule.end_time),
    );
    activity.metadata.insert("scheduleId".into(), json!(schedule.id));
    record_activity(&state.store, activity).await;

    Ok(ApiResponse::ok(schedule).with_message("schedule created"))
}

pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: FormInput,
) -> Result<ApiResponse<Schedule>, AppError> {
    let fields = schedule_fields(&state, &input).await?;
    let schedule = state
        .store
        .schedules()
        .replace(&id, &fields)
        .await
        .map_err(AppError::upstream("updating the schedule"))?
        .ok_or(AppError::not_found("schedule"))?;
    Ok(ApiResponse::ok(schedule).with_message("schedule updated"))
}

pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<Schedule>, AppError> {
    let requested = toggle_value(&body, "active")?;
    let schedules = state.store.schedules();
    let current = schedules
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the schedule"))?
        .ok_or(AppError::not_found("schedule"))?;
    let schedule = schedules
        .set_active(&id, requested.unwrap_or(!current.active))
        .await
        .map_err(AppError::upstream("updating the schedule"))?
        .ok_or(AppError::not_found("schedule"))?;
    Ok(ApiResponse::ok(schedule))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<()>, AppError> {
    let removed = state
        .store
        .schedules()
        .delete(&id)
        .await
        .map_err(AppError::upstream("deleting the schedule"))?;
    if !removed {
        return Err(AppError::not_found("schedule"));
    }
    Ok(ApiResponse::done("schedule deleted"))
}

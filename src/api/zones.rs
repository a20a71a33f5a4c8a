// src/api/zones.rs
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

use crate::api::envelope::ApiResponse;
use crate::api::extract::{store_image, toggle_value, FormInput, QueryParams};
use crate::api::{record_activity, AppState};
use crate::error::AppError;
use crate::store::activities::NewActivity;
use crate::store::zones::{Zone, ZoneFields, ZoneFilter, IMAGE_BUCKET};
use crate::validation::{self, ZONE_NAME_MAX};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub active: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<ListParams>,
) -> Result<ApiResponse<Vec<Zone>>, AppError> {
    let filter = ZoneFilter {
        active: p.active,
        search: p.search,
        limit: p.limit,
        offset: p.offset,
    };
    let zones = state
        .store
        .zones()
        .list(&filter)
        .await
        .map_err(AppError::upstream("listing zones"))?;
    Ok(ApiResponse::ok(zones))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Zone>, AppError> {
    let zone = state
        .store
        .zones()
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the zone"))?
        .ok_or(AppError::not_found("zone"))?;
    Ok(ApiResponse::ok(zone))
}

/// Validate everything except the image, which needs the store.
fn zone_fields(input: &FormInput, image_url: Option<String>) -> Result<ZoneFields, AppError> {
    let name = validation::required_text("name", input.text("name"), Some(ZONE_NAME_MAX))?;
    let floor = match input.int("floor")? {
        None => None,
        Some(f) => Some(i32::try_from(f).map_err(|_| AppError::validation("floor is out of range"))?),
    };
    Ok(ZoneFields {
        name,
        description: validation::optional_text(input.text("description")).unwrap_or_default(),
        floor,
        capacity: validation::capacity(input.int("capacity")?)?,
        image_url,
        active: input.flag("active")?.unwrap_or(true),
    })
}

async fn resolve_image(state: &AppState, input: &mut FormInput) -> Result<Option<String>, AppError> {
    match input.image.take() {
        Some(upload) => store_image(&state.store, IMAGE_BUCKET, upload).await.map(Some),
        None => Ok(validation::optional_text(input.text("image_url"))),
    }
}

pub async fn create(State(state): State<AppState>, mut input: FormInput) -> Result<ApiResponse<Zone>, AppError> {
    // Validate before uploading so a bad form leaves no orphaned object.
    zone_fields(&input, None)?;
    let image_url = resolve_image(&state, &mut input).await?;
    let fields = zone_fields(&input, image_url)?;

    let zone = state
        .store
        .zones()
        .create(&fields)
        .await
        .map_err(AppError::upstream("creating the zone"))?;
    tracing::info!(target: "api", zone_id = %zone.id, "zone created");

    let mut activity = NewActivity::new("content", format!("New zone: {}", zone.name), zone.description.clone());
    activity.metadata.insert("zoneId".into(), json!(zone.id));
    record_activity(&state.store, activity).await;

    Ok(ApiResponse::ok(zone).with_message("zone created"))
}

pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut input: FormInput,
) -> Result<ApiResponse<Zone>, AppError> {
    zone_fields(&input, None)?;
    let existing = state
        .store
        .zones()
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the zone"))?
        .ok_or(AppError::not_found("zone"))?;

    let image_url = resolve_image(&state, &mut input).await?.or(existing.image_url);
    let fields = zone_fields(&input, image_url)?;
    let zone = state
        .store
        .zones()
        .replace(&id, &fields)
        .await
        .map_err(AppError::upstream("updating the zone"))?
        .ok_or(AppError::not_found("zone"))?;
    Ok(ApiResponse::ok(zone).with_message("zone updated"))
}

/// PATCH toggles `active` unless the body sets it explicitly.
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<Zone>, AppError> {
    let requested = toggle_value(&body, "active")?;
    let zones = state.store.zones();
    let current = zones
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the zone"))?
        .ok_or(AppError::not_found("zone"))?;
    let zone = zones
        .set_active(&id, requested.unwrap_or(!current.active))
        .await
        .map_err(AppError::upstream("updating the zone"))?
        .ok_or(AppError::not_found("zone"))?;
    Ok(ApiResponse::ok(zone))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<()>, AppError> {
    let removed = state
        .store
        .zones()
        .delete(&id)
        .await
        .map_err(AppError::upstream("deleting the zone"))?;
    if !removed {
        return Err(AppError::not_found("zone"));
    }
    Ok(ApiResponse::done("zone deleted"))
}

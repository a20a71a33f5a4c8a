// src/api/reviews.rs
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::envelope::ApiResponse;
use crate::api::extract::{toggle_value, FormInput, QueryParams};
use crate::api::AppState;
use crate::error::AppError;
use crate::store::reviews::{Review, ReviewFields, ReviewFilter};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub approved: Option<bool>,
    pub min_rating: Option<u8>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<ListParams>,
) -> Result<ApiResponse<Vec<Review>>, AppError> {
    let filter = ReviewFilter {
        approved: p.approved,
        min_rating: p.min_rating,
        limit: p.limit,
        offset: p.offset,
    };
    let reviews = state
        .store
        .reviews()
        .list(&filter)
        .await
        .map_err(AppError::upstream("listing reviews"))?;
    Ok(ApiResponse::ok(reviews))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Review>, AppError> {
    let review = state
        .store
        .reviews()
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the review"))?
        .ok_or(AppError::not_found("review"))?;
    Ok(ApiResponse::ok(review))
}

fn review_fields(input: &FormInput) -> Result<ReviewFields, AppError> {
    Ok(ReviewFields {
        visitor_name: validation::required_text("visitor_name", input.text("visitor_name"), None)?,
        rating: validation::rating(input.int("rating")?)?,
        comment: validation::optional_text(input.text("comment")).unwrap_or_default(),
        approved: input.flag("approved")?.unwrap_or(false),
    })
}

pub async fn create(State(state): State<AppState>, input: FormInput) -> Result<ApiResponse<Review>, AppError> {
    let fields = review_fields(&input)?;
    let review = state
        .store
        .reviews()
        .create(&fields)
        .await
        .map_err(AppError::upstream("creating the review"))?;
    Ok(ApiResponse::ok(review).with_message("review created"))
}

pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    input: FormInput,
) -> Result<ApiResponse<Review>, AppError> {
    let fields = review_fields(&input)?;
    let review = state
        .store
        .reviews()
        .replace(&id, &fields)
        .await
        .map_err(AppError::upstream("updating the review"))?
        .ok_or(AppError::not_found("review"))?;
    Ok(ApiResponse::ok(review).with_message("review updated"))
}

/// PATCH toggles `approved` unless the body sets it explicitly.
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<Review>, AppError> {
    let requested = toggle_value(&body, "approved")?;
    let reviews = state.store.reviews();
    let current = reviews
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the review"))?
        .ok_or(AppError::not_found("review"))?;
    let review = reviews
        .set_approved(&id, requested.unwrap_or(!current.approved))
        .await
        .map_err(AppError::upstream("updating the review"))?
        .ok_or(AppError::not_found("review"))?;
    Ok(ApiResponse::ok(review))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<()>, AppError> {
    let removed = state
        .store
        .reviews()
        .delete(&id)
        .await
        .map_err(AppError::upstream("deleting the review"))?;
    if !removed {
        return Err(AppError::not_found("review"));
    }
    Ok(ApiResponse::done("review deleted"))
}

// src/api/news.rs
use axum::body::Bytes;
use axum::extract::{Path, State};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::api::envelope::ApiResponse;
use crate::api::extract::{store_image, toggle_value, FormInput, QueryParams};
use crate::api::{record_activity, AppState};
use crate::error::AppError;
use crate::store::activities::NewActivity;
use crate::store::news::{NewsArticle, NewsFields, NewsFilter, IMAGE_BUCKET};
use crate::validation::{self, NEWS_TITLE_MAX};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub published: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub async fn list(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<ListParams>,
) -> Result<ApiResponse<Vec<NewsArticle>>, AppError> {
    let filter = NewsFilter {
        published: p.published,
        search: p.search,
        limit: p.limit,
        offset: p.offset,
    };
    let items = state
        .store
        .news()
        .list(&filter)
        .await
        .map_err(AppError::upstream("listing news"))?;
    Ok(ApiResponse::ok(items))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<NewsArticle>, AppError> {
    let item = state
        .store
        .news()
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the news item"))?
        .ok_or(AppError::not_found("news item"))?;
    Ok(ApiResponse::ok(item))
}

/// `published_at` is kept from `previous` when the item stays published.
fn news_fields(
    input: &FormInput,
    image_url: Option<String>,
    previous: Option<&NewsArticle>,
) -> Result<NewsFields, AppError> {
    let title = validation::required_text("title", input.text("title"), Some(NEWS_TITLE_MAX))?;
    let published = input.flag("published")?.unwrap_or(false);
    let published_at = if published {
        previous
            .filter(|p| p.published)
            .and_then(|p| p.published_at.clone())
            .or_else(|| Some(now_stamp()))
    } else {
        None
    };
    Ok(NewsFields {
        title,
        summary: validation::optional_text(input.text("summary")).unwrap_or_default(),
        body: validation::optional_text(input.text("body")).unwrap_or_default(),
        image_url,
        author: validation::optional_text(input.text("author")),
        published,
        published_at,
    })
}

async fn resolve_image(state: &AppState, input: &mut FormInput) -> Result<Option<String>, AppError> {
    match input.image.take() {
        Some(upload) => store_image(&state.store, IMAGE_BUCKET, upload).await.map(Some),
        None => Ok(validation::optional_text(input.text("image_url"))),
    }
}

pub async fn create(
    State(state): State<AppState>,
    mut input: FormInput,
) -> Result<ApiResponse<NewsArticle>, AppError> {
    news_fields(&input, None, None)?;
    let image_url = resolve_image(&state, &mut input).await?;
    let fields = news_fields(&input, image_url, None)?;

    let item = state
        .store
        .news()
        .create(&fields)
        .await
        .map_err(AppError::upstream("creating the news item"))?;
    tracing::info!(target: "api", news_id = %item.id, published = item.published, "news item created");

    // Drafts still leave a trail, just not a public one.
    let mut activity = NewActivity::new("news", item.title.clone(), item.summary.clone());
    activity.is_public = item.published;
    activity.metadata.insert("newsId".into(), json!(item.id));
    record_activity(&state.store, activity).await;

    Ok(ApiResponse::ok(item).with_message("news item created"))
}

pub async fn replace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut input: FormInput,
) -> Result<ApiResponse<NewsArticle>, AppError> {
    news_fields(&input, None, None)?;
    let existing = state
        .store
        .news()
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the news item"))?
        .ok_or(AppError::not_found("news item"))?;

    let image_url = resolve_image(&state, &mut input).await?.or_else(|| existing.image_url.clone());
    let fields = news_fields(&input, image_url, Some(&existing))?;
    let item = state
        .store
        .news()
        .replace(&id, &fields)
        .await
        .map_err(AppError::upstream("updating the news item"))?
        .ok_or(AppError::not_found("news item"))?;
    Ok(ApiResponse::ok(item).with_message("news item updated"))
}

/// PATCH toggles `published` unless the body sets it explicitly.
pub async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<NewsArticle>, AppError> {
    let requested = toggle_value(&body, "published")?;
    let news = state.store.news();
    let current = news
        .get(&id)
        .await
        .map_err(AppError::upstream("loading the news item"))?
        .ok_or(AppError::not_found("news item"))?;

    let published = requested.unwrap_or(!current.published);
    let stamp = match (&current.published_at, current.published) {
        (Some(at), true) => at.clone(),
        _ => now_stamp(),
    };
    let item = news
        .set_published(&id, published, Some(&stamp))
        .await
        .map_err(AppError::upstream("updating the news item"))?
        .ok_or(AppError::not_found("news item"))?;
    Ok(ApiResponse::ok(item))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<()>, AppError> {
    let removed = state
        .store
        .news()
        .delete(&id)
        .await
        .map_err(AppError::upstream("deleting the news item"))?;
    if !removed {
        return Err(AppError::not_found("news item"));
    }
    Ok(ApiResponse::done("news item deleted"))
}

// src/api/dashboard.rs
use std::collections::HashMap;

use axum::extract::State;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::envelope::ApiResponse;
use crate::api::extract::{FormInput, QueryParams};
use crate::api::AppState;
use crate::dashboard::{
    bucket_daily, growth_pct, rank_popularity, rolling_average, summarize, DailyCount, PopularityEntry,
    VisitorStats, DEFAULT_DAYS, MAX_DAYS, ROLLING_WINDOW_DAYS,
};
use crate::error::AppError;
use crate::store::news::NewsFilter;
use crate::store::reviews::ReviewFilter;
use crate::store::schedules::ScheduleFilter;
use crate::store::visits::{Visit, VisitFields};
use crate::store::zones::ZoneFilter;
use crate::validation;

const DEFAULT_POPULAR_LIMIT: usize = 5;
const MAX_POPULAR_LIMIT: usize = 50;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("{field} must use YYYY-MM-DD")))
}

fn window_days(days: Option<u32>) -> Result<u32, AppError> {
    match days {
        None => Ok(DEFAULT_DAYS),
        Some(d) if (1..=MAX_DAYS).contains(&d) => Ok(d),
        Some(_) => Err(AppError::validation(format!("days must be between 1 and {MAX_DAYS}"))),
    }
}

/// Rows with an unparsable date are skipped with a warning.
fn dated(visits: &[Visit]) -> Vec<(NaiveDate, u64)> {
    visits
        .iter()
        .filter_map(|v| match NaiveDate::parse_from_str(&v.date, "%Y-%m-%d") {
            Ok(d) => Some((d, v.count)),
            Err(_) => {
                tracing::warn!(target: "api", visit_id = %v.id, date = %v.date, "skipping visit with bad date");
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct VisitorParams {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: u32,
    pub daily: Vec<DailyCount>,
    pub rolling_average: Vec<f64>,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
    pub stats: VisitorStats,
}

/// GET /api/dashboard/visitors?days=N
pub async fn visitors(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<VisitorParams>,
) -> Result<ApiResponse<VisitorReport>, AppError> {
    let days = window_days(p.days)?;
    let to = today();
    let from = to - Duration::days(i64::from(days) - 1);

    let visits = state
        .store
        .visits()
        .between(from, to)
        .await
        .map_err(AppError::upstream("loading visitor counts"))?;

    let daily = bucket_daily(from, days, &dated(&visits));
    let counts: Vec<u64> = daily.iter().map(|d| d.count).collect();
    let stats = summarize(&counts);
    let day_at = |idx: Option<usize>| idx.and_then(|i| daily.get(i)).map(|d| d.date);
    let (peak_date, trough_date) = (day_at(stats.peak_day), day_at(stats.trough_day));

    Ok(ApiResponse::ok(VisitorReport {
        from,
        to,
        days,
        rolling_average: rolling_average(&counts, ROLLING_WINDOW_DAYS),
        peak_date,
        trough_date,
        daily,
        stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub days: Option<u32>,
    pub limit: Option<usize>,
}

/// GET /api/dashboard/popular?days=N&limit=M
pub async fn popular(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<PopularParams>,
) -> Result<ApiResponse<Vec<PopularityEntry>>, AppError> {
    let days = window_days(p.days)?;
    let limit = p.limit.unwrap_or(DEFAULT_POPULAR_LIMIT).clamp(1, MAX_POPULAR_LIMIT);
    let to = today();
    let from = to - Duration::days(i64::from(days) - 1);

    let visits = state
        .store
        .visits()
        .between(from, to)
        .await
        .map_err(AppError::upstream("loading visitor counts"))?;
    let zones = state
        .store
        .zones()
        .list(&ZoneFilter::default())
        .await
        .map_err(AppError::upstream("listing zones"))?;

    let mut per_zone: HashMap<&str, u64> = HashMap::new();
    for v in &visits {
        if let Some(zone_id) = v.zone_id.as_deref() {
            *per_zone.entry(zone_id).or_default() += v.count;
        }
    }

    // Active zones always appear; inactive ones only if they had visits.
    let totals: Vec<(String, String, u64)> = zones
        .iter()
        .filter_map(|z| {
            let visits = per_zone.get(z.id.as_str()).copied().unwrap_or(0);
            (z.active || visits > 0).then(|| (z.id.clone(), z.name.clone(), visits))
        })
        .collect();

    let mut ranked = rank_popularity(totals);
    ranked.truncate(limit);
    Ok(ApiResponse::ok(ranked))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub active_zones: usize,
    pub active_schedules: usize,
    pub published_news: usize,
    pub pending_reviews: usize,
    pub average_rating: Option<f64>,
    pub visitors_today: u64,
    pub visitors_yesterday: u64,
    pub growth_pct: Option<f64>,
}

/// GET /api/dashboard/kpis
pub async fn kpis(State(state): State<AppState>) -> Result<ApiResponse<Kpis>, AppError> {
    let store = &state.store;
    let active_zones = store
        .zones()
        .list(&ZoneFilter {
            active: Some(true),
            ..ZoneFilter::default()
        })
        .await
        .map_err(AppError::upstream("counting zones"))?
        .len();
    let active_schedules = store
        .schedules()
        .list(&ScheduleFilter {
            active: Some(true),
            ..ScheduleFilter::default()
        })
        .await
        .map_err(AppError::upstream("counting schedules"))?
        .len();
    let published_news = store
        .news()
        .list(&NewsFilter {
            published: Some(true),
            ..NewsFilter::default()
        })
        .await
        .map_err(AppError::upstream("counting news"))?
        .len();
    let reviews = store
        .reviews()
        .list(&ReviewFilter::default())
        .await
        .map_err(AppError::upstream("loading reviews"))?;

    let pending_reviews = reviews.iter().filter(|r| !r.approved).count();
    let approved: Vec<u64> = reviews
        .iter()
        .filter(|r| r.approved)
        .map(|r| u64::from(r.rating))
        .collect();
    let average_rating = (!approved.is_empty())
        .then(|| (approved.iter().sum::<u64>() as f64 / approved.len() as f64 * 100.0).round() / 100.0);

    let to = today();
    let from = to - Duration::days(1);
    let visits = store
        .visits()
        .between(from, to)
        .await
        .map_err(AppError::upstream("loading visitor counts"))?;
    let daily = bucket_daily(from, 2, &dated(&visits));
    let (visitors_yesterday, visitors_today) = (daily[0].count, daily[1].count);

    Ok(ApiResponse::ok(Kpis {
        active_zones,
        active_schedules,
        published_news,
        pending_reviews,
        average_rating,
        visitors_today,
        visitors_yesterday,
        growth_pct: growth_pct(visitors_yesterday, visitors_today),
    }))
}

/// POST /api/visits
pub async fn record_visit(State(state): State<AppState>, input: FormInput) -> Result<ApiResponse<Visit>, AppError> {
    let count = match input.int("count")? {
        None => 1,
        Some(c) if c >= 1 => c as u64,
        Some(_) => return Err(AppError::validation("count must be at least 1")),
    };
    let date = match validation::optional_text(input.text("date")) {
        Some(raw) => parse_date("date", &raw)?,
        None => today(),
    };

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

    let visit = state
        .store
        .visits()
        .record(&VisitFields {
            zone_id,
            date: date.format("%Y-%m-%d").to_string(),
            count,
        })
        .await
        .map_err(AppError::upstream("recording the visit"))?;
    Ok(ApiResponse::ok(visit).with_message("visit recorded"))
}

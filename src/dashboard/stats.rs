// src/dashboard/stats.rs
//! Pure aggregation over daily visitor counts. No I/O here.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

pub const NO_DATA_INSIGHT: &str = "No visitor data for this period yet.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorStats {
    pub total: u64,
    pub mean: f64,
    pub max: u64,
    pub min: u64,
    /// Last day against the one before. `None` when there is no previous day
    /// or it had zero visitors.
    pub growth_pct: Option<f64>,
    /// Index of the first day reaching `max`.
    pub peak_day: Option<usize>,
    /// Index of the first day reaching `min`.
    pub trough_day: Option<usize>,
    pub daily_growth: Vec<Option<f64>>,
    pub insight: String,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn growth_pct(previous: u64, current: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    Some(round2((current as f64 - previous as f64) / previous as f64 * 100.0))
}

pub fn summarize(counts: &[u64]) -> VisitorStats {
    if counts.is_empty() {
        return VisitorStats {
            total: 0,
            mean: 0.0,
            max: 0,
            min: 0,
            growth_pct: None,
            peak_day: None,
            trough_day: None,
            daily_growth: Vec::new(),
            insight: NO_DATA_INSIGHT.to_string(),
        };
    }

    let total: u64 = counts.iter().sum();
    let mean = round2(total as f64 / counts.len() as f64);
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    let peak_day = counts.iter().position(|&c| c == max);
    let trough_day = counts.iter().position(|&c| c == min);

    let daily_growth: Vec<Option<f64>> = std::iter::once(None)
        .chain(counts.windows(2).map(|w| growth_pct(w[0], w[1])))
        .collect();
    let growth = daily_growth.last().copied().flatten();

    VisitorStats {
        total,
        mean,
        max,
        min,
        growth_pct: growth,
        peak_day,
        trough_day,
        daily_growth,
        insight: insight(growth, max, counts.len()),
    }
}

fn insight(growth: Option<f64>, max: u64, days: usize) -> String {
    match growth {
        Some(g) if g > 0.0 => format!("Visitors up {g:.1}% on the previous day; best day had {max}."),
        Some(g) if g < 0.0 => format!("Visitors down {:.1}% on the previous day; best day had {max}.", g.abs()),
        Some(_) => format!("Visitors flat on the previous day; best day had {max}."),
        None if days < 2 => format!("Only one day of data so far ({max} visitors)."),
        None => format!("No visitors the previous day to compare against; best day had {max}."),
    }
}

/// Trailing mean over up to `window` days; the first days average what exists.
pub fn rolling_average(counts: &[u64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..counts.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &counts[start..=i];
            round2(slice.iter().sum::<u64>() as f64 / slice.len() as f64)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// One entry per calendar day in `from..from+days`, summing rows that fall on
/// the same day. Days without rows are zero; rows outside the range are ignored.
pub fn bucket_daily(from: NaiveDate, days: u32, rows: &[(NaiveDate, u64)]) -> Vec<DailyCount> {
    let mut sums: HashMap<NaiveDate, u64> = HashMap::new();
    for (date, count) in rows {
        *sums.entry(*date).or_default() += count;
    }
    (0..i64::from(days))
        .map(|offset| {
            let date = from + Duration::days(offset);
            DailyCount {
                date,
                count: sums.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularityEntry {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub visits: u64,
    pub share_pct: f64,
}

/// Highest visit count first; equal counts keep name order.
pub fn rank_popularity(totals: Vec<(String, String, u64)>) -> Vec<PopularityEntry> {
    let grand: u64 = totals.iter().map(|(_, _, v)| v).sum();
    let mut totals = totals;
    totals.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
    totals
        .into_iter()
        .enumerate()
        .map(|(i, (id, name, visits))| PopularityEntry {
            rank: i + 1,
            id,
            name,
            visits,
            share_pct: if grand == 0 {
                0.0
            } else {
                round2(visits as f64 / grand as f64 * 100.0)
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_summary() {
        let stats = summarize(&[10, 20, 30, 0, 15, 25, 5]);
        assert_eq!(stats.total, 105);
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.max, 30);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.growth_pct, Some(-80.0));
        assert_eq!(stats.peak_day, Some(2));
        assert_eq!(stats.trough_day, Some(3));
        // 30 -> 0 is fine, 0 -> 15 has no baseline
        assert_eq!(stats.daily_growth[3], Some(-100.0));
        assert_eq!(stats.daily_growth[4], None);
        assert!(stats.insight.contains("down 80.0%"));
    }

    #[test]
    fn empty_input_is_zeroed() {
        let stats = summarize(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.max, 0);
        assert_eq!(stats.min, 0);
        assert_eq!(stats.growth_pct, None);
        assert_eq!(stats.peak_day, None);
        assert_eq!(stats.insight, NO_DATA_INSIGHT);
    }

    #[test]
    fn zero_previous_day_is_not_applicable() {
        let stats = summarize(&[0, 12]);
        assert_eq!(stats.growth_pct, None);
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["growthPct"].is_null());
    }

    #[test]
    fn growth_rounding() {
        assert_eq!(growth_pct(3, 4), Some(33.33));
        assert_eq!(growth_pct(10, 10), Some(0.0));
    }

    #[test]
    fn rolling_three_day() {
        assert_eq!(rolling_average(&[3, 6, 9, 12], 3), vec![3.0, 4.5, 6.0, 9.0]);
        assert!(rolling_average(&[], 3).is_empty());
    }

    #[test]
    fn buckets_fill_missing_days() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let rows = vec![(d("2026-05-02"), 4), (d("2026-05-02"), 6), (d("2026-05-04"), 1), (d("2026-04-01"), 99)];
        let buckets = bucket_daily(d("2026-05-01"), 4, &rows);
        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 10, 0, 1]);
        assert_eq!(buckets[3].date, d("2026-05-04"));
    }

    #[test]
    fn popularity_ranking() {
        let ranked = rank_popularity(vec![
            ("z2".into(), "Egypt".into(), 30),
            ("z1".into(), "Bronze Age".into(), 30),
            ("z3".into(), "Coins".into(), 40),
        ]);
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Coins", "Bronze Age", "Egypt"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[0].share_pct, 40.0);
        assert_eq!(ranked[2].share_pct, 30.0);
    }
}

// src/dashboard/mod.rs
pub mod stats;

pub use stats::{
    bucket_daily, growth_pct, rank_popularity, rolling_average, summarize, DailyCount, PopularityEntry,
    VisitorStats,
};

pub const ROLLING_WINDOW_DAYS: usize = 3;
pub const DEFAULT_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 90;

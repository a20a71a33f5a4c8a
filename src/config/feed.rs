// src/config/feed.rs
//! Tunables for the activity feed. None of these are contracts; the defaults
//! match what the dashboard has always used.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_FEED_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_FEED_CONFIG_PATH: &str = "config/feed.toml";
pub const DEFAULT_CACHE_PATH: &str = "state/activity_feed.json";

fn default_max_events() -> usize {
    50
}
fn default_recency_secs() -> u64 {
    30
}
fn default_debounce_secs() -> u64 {
    10
}
fn default_cache_max_age_secs() -> u64 {
    300
}
fn default_retry_backoff_secs() -> u64 {
    15
}
fn default_refresh_interval_secs() -> u64 {
    60
}
fn default_reconnect_delay_secs() -> u64 {
    5
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    #[serde(default = "default_recency_secs")]
    pub recency_secs: u64,
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
    #[serde(default = "default_cache_max_age_secs")]
    pub cache_max_age_secs: u64,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            recency_secs: default_recency_secs(),
            debounce_secs: default_debounce_secs(),
            cache_max_age_secs: default_cache_max_age_secs(),
            retry_backoff_secs: default_retry_backoff_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            cache_path: default_cache_path(),
        }
    }
}

impl FeedConfig {
    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_secs)
    }
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FeedConfig = toml::from_str(s).context("parsing feed config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolution order:
    /// 1) $FEED_CONFIG_PATH (must exist)
    /// 2) config/feed.toml (optional)
    /// 3) built-in defaults
    ///
    /// `FEED_*` variables are applied on top.
    pub fn load_default() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_FEED_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    anyhow::bail!("{ENV_FEED_CONFIG_PATH} points to non-existent path");
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_FEED_CONFIG_PATH);
                if pb.exists() {
                    Self::load_from_file(&pb)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env();
        Ok(cfg.sanitized())
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse("FEED_MAX_EVENTS") {
            self.max_events = v;
        }
        let secs: [(&str, &mut u64); 7] = [
            ("FEED_RECENCY_SECS", &mut self.recency_secs),
            ("FEED_DEBOUNCE_SECS", &mut self.debounce_secs),
            ("FEED_CACHE_MAX_AGE_SECS", &mut self.cache_max_age_secs),
            ("FEED_RETRY_BACKOFF_SECS", &mut self.retry_backoff_secs),
            ("FEED_REFRESH_INTERVAL_SECS", &mut self.refresh_interval_secs),
            ("FEED_RECONNECT_DELAY_SECS", &mut self.reconnect_delay_secs),
            ("FEED_FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs),
        ];
        for (key, slot) in secs {
            if let Some(v) = env_parse(key) {
                *slot = v;
            }
        }
        if let Ok(p) = std::env::var("FEED_CACHE_PATH") {
            if !p.trim().is_empty() {
                self.cache_path = PathBuf::from(p);
            }
        }
    }

    fn sanitized(mut self) -> Self {
        self.max_events = self.max_events.max(1);
        // Zero would spin the reconnect loop and the interval timer.
        self.reconnect_delay_secs = self.reconnect_delay_secs.max(1);
        self.refresh_interval_secs = self.refresh_interval_secs.max(1);
        self.fetch_timeout_secs = self.fetch_timeout_secs.max(1);
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

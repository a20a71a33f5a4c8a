// src/config/store.rs
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const ENV_STORE_BACKEND: &str = "STORE_BACKEND";
pub const ENV_STORE_URL: &str = "STORE_URL";
pub const ENV_STORE_API_KEY: &str = "STORE_API_KEY";
pub const ENV_STORE_TIMEOUT_SECS: &str = "STORE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Rest,
}

impl BackendKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(BackendKind::Memory),
            "rest" | "remote" => Some(BackendKind::Rest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// `STORE_*` variables; unset values keep their defaults. A REST backend
    /// without URL and key is a startup error.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = non_empty_env(ENV_STORE_BACKEND) {
            let Some(kind) = BackendKind::parse(&raw) else {
                bail!("{ENV_STORE_BACKEND} must be 'memory' or 'rest', got '{raw}'");
            };
            cfg.backend = kind;
        }
        cfg.url = non_empty_env(ENV_STORE_URL).map(|u| u.trim_end_matches('/').to_string());
        cfg.api_key = non_empty_env(ENV_STORE_API_KEY);
        if let Some(secs) = non_empty_env(ENV_STORE_TIMEOUT_SECS).and_then(|s| s.trim().parse().ok()) {
            cfg.timeout_secs = secs;
        }

        if cfg.backend == BackendKind::Rest && (cfg.url.is_none() || cfg.api_key.is_none()) {
            bail!("{ENV_STORE_BACKEND}=rest requires {ENV_STORE_URL} and {ENV_STORE_API_KEY}");
        }
        Ok(cfg)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

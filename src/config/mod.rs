// src/config/mod.rs
pub mod feed;
pub mod store;

pub use feed::FeedConfig;
pub use store::{BackendKind, StoreConfig};

/// Everything the composition root needs, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub feed: FeedConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            store: StoreConfig::from_env()?,
            feed: FeedConfig::load_default()?,
        })
    }
}

// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod activity;
pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod metrics;
pub mod store;
pub mod validation;

use std::sync::Arc;

use anyhow::Context;

pub use crate::api::{router, AppState};

use crate::activity::{
    FeedRuntime, FeedSynchronizer, FileSnapshotCache, SnapshotCache, StoreActivitySource, StorePushChannel,
};
use crate::auth::{User, ADMIN_ROLE};
use crate::config::{AppConfig, BackendKind, FeedConfig, StoreConfig};
use crate::store::{MemoryBackend, RestBackend, Store};

pub const ENV_ADMIN_DEV_TOKEN: &str = "ADMIN_DEV_TOKEN";

pub fn build_store(cfg: &StoreConfig) -> anyhow::Result<Store> {
    let store = match cfg.backend {
        BackendKind::Rest => {
            let backend = RestBackend::from_config(cfg).context("building REST store backend")?;
            Store::new(Arc::new(backend))
        }
        BackendKind::Memory => {
            let backend = MemoryBackend::new();
            if let Ok(token) = std::env::var(ENV_ADMIN_DEV_TOKEN) {
                if !token.trim().is_empty() {
                    backend.add_user(token.trim(), User::with_role("dev-admin", ADMIN_ROLE));
                }
            }
            Store::new(Arc::new(backend))
        }
    };
    tracing::info!(backend = store.backend().name(), "store ready");
    Ok(store)
}

/// State without background tasks; the feed only changes through explicit
/// refreshes and pushes.
pub fn app_with(store: Store, cache: Arc<dyn SnapshotCache>, feed: FeedConfig) -> AppState {
    let source = Arc::new(StoreActivitySource::new(store.clone()));
    let sync = Arc::new(FeedSynchronizer::new(source, cache, feed));
    AppState::new(store, sync)
}

/// Composition root used by the binary: picks the backend, builds the single
/// feed synchronizer and starts its refresh and push tasks. Needs a running
/// tokio runtime.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = build_store(&cfg.store)?;
    let cache = Arc::new(FileSnapshotCache::new(cfg.feed.cache_path.clone()));
    let state = app_with(store.clone(), cache, cfg.feed.clone());
    let runtime = FeedRuntime::spawn(state.feed.clone(), Arc::new(StorePushChannel::new(store)));
    Ok(state.with_runtime(runtime))
}

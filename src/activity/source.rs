// src/activity/source.rs
use std::time::Duration;

use thiserror::Error;

use crate::store::{Row, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("activity fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("activity fetch failed: {0}")]
    Upstream(String),
}

impl From<StoreError> for FetchError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout => FetchError::Upstream("store request timed out".to_string()),
            other => FetchError::Upstream(other.to_string()),
        }
    }
}

/// Batch side of the feed: the most recent public activity rows.
#[async_trait::async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Row>, FetchError>;
}

pub struct StoreActivitySource {
    store: Store,
}

impl StoreActivitySource {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ActivitySource for StoreActivitySource {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Row>, FetchError> {
        Ok(self.store.activities().recent_public(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn store_source_returns_public_rows_newest_first() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(
            "activities",
            vec![
                json!({"id": "1", "created_at": "2026-01-01T00:00:00Z", "is_public": true}),
                json!({"id": "2", "created_at": "2026-01-02T00:00:00Z", "is_public": false}),
                json!({"id": "3", "created_at": "2026-01-03T00:00:00Z", "is_public": true}),
            ]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
        );
        let src = StoreActivitySource::new(Store::new(backend.clone()));
        let rows = src.fetch_recent(10).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["3", "1"]);

        backend.fail_next(1);
        assert!(matches!(src.fetch_recent(10).await, Err(FetchError::Upstream(_))));
    }
}

// src/activity/cache.rs
//! Single-slot fallback snapshot of the feed. Best effort: write failures are
//! logged and swallowed, unreadable files read as "no snapshot".

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activity::types::ActivityEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSnapshot {
    pub events: Vec<ActivityEvent>,
    pub total: usize,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
}

impl CachedSnapshot {
    pub fn new(events: Vec<ActivityEvent>, timestamp: i64) -> Self {
        Self {
            total: events.len(),
            events,
            timestamp,
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }

    /// Snapshots written "in the future" (clock skew) are treated as fresh.
    pub fn is_fresh(&self, now_ms: i64, max_age: Duration) -> bool {
        let max = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        self.age_ms(now_ms) <= max
    }
}

#[async_trait::async_trait]
pub trait SnapshotCache: Send + Sync {
    async fn load(&self) -> Option<CachedSnapshot>;
    async fn store(&self, snapshot: &CachedSnapshot);
}

pub struct FileSnapshotCache {
    path: PathBuf,
}

impl FileSnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl SnapshotCache for FileSnapshotCache {
    async fn load(&self) -> Option<CachedSnapshot> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(snap) => Some(snap),
            Err(e) => {
                tracing::warn!(target: "activity_feed", path = %self.path.display(), error = %e, "ignoring unreadable feed snapshot");
                None
            }
        }
    }

    async fn store(&self, snapshot: &CachedSnapshot) {
        let bytes = match serde_json::to_vec(snapshot) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(target: "activity_feed", error = %e, "feed snapshot not serializable");
                return;
            }
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                tracing::warn!(target: "activity_feed", path = %dir.display(), error = %e, "cannot create snapshot dir");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(&self.path, bytes).await {
            tracing::warn!(target: "activity_feed", path = %self.path.display(), error = %e, "feed snapshot write failed");
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySnapshotCache {
    slot: Mutex<Option<CachedSnapshot>>,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: CachedSnapshot) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait::async_trait]
impl SnapshotCache for MemorySnapshotCache {
    async fn load(&self) -> Option<CachedSnapshot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn store(&self, snapshot: &CachedSnapshot) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
    }
}

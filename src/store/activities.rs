// src/store/activities.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::{Direction, Query, Row, Store, StoreError};

pub const TABLE: &str = "activities";

/// Row shape written to the activities table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_public() -> bool {
    true
}

impl NewActivity {
    pub fn new(kind: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            title: title.into(),
            description: description.into(),
            priority: None,
            is_public: true,
            metadata: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub limit: Option<usize>,
    pub kind: Option<String>,
    pub priority: Option<String>,
}

pub struct ActivityService<'a> {
    store: &'a Store,
}

impl<'a> ActivityService<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Most recent publicly visible rows, newest first. Rows without the flag
    /// count as public. Rows are returned raw so malformed ones can be dropped
    /// by the caller.
    pub async fn recent_public(&self, limit: usize) -> Result<Vec<Row>, StoreError> {
        let q = Query::new()
            .not_false("is_public")
            .order_by("created_at", Direction::Desc)
            .limit(limit);
        self.store.backend().select(TABLE, &q).await
    }

    pub async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Row>, StoreError> {
        let mut q = Query::new().order_by("created_at", Direction::Desc);
        if let Some(kind) = &filter.kind {
            q = q.eq("kind", kind.as_str());
        }
        if let Some(priority) = &filter.priority {
            q = q.eq("priority", priority.as_str());
        }
        if let Some(limit) = filter.limit {
            q = q.limit(limit);
        }
        self.store.backend().select(TABLE, &q).await
    }

    pub async fn create(&self, activity: &NewActivity) -> Result<Row, StoreError> {
        self.store
            .insert_row(TABLE, crate::store::to_row(activity)?)
            .await
    }
}

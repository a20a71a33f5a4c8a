// src/store/zones.rs
use serde::{Deserialize, Serialize};

use crate::store::{Direction, Query, Records, Store, StoreError};

pub const TABLE: &str = "zones";
pub const IMAGE_BUCKET: &str = "zone-images";

/// A museum zone or section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(deserialize_with = "crate::store::string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Validated field set for create and full update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFields {
    pub name: String,
    pub description: String,
    pub floor: Option<i32>,
    pub capacity: Option<u32>,
    pub image_url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneFilter {
    pub active: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
struct ActivePatch {
    active: bool,
}

pub struct ZoneService<'a> {
    records: Records<'a, Zone>,
}

impl<'a> ZoneService<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            records: Records::new(store, TABLE),
        }
    }

    pub async fn list(&self, filter: &ZoneFilter) -> Result<Vec<Zone>, StoreError> {
        let mut q = Query::new().order_by("name", Direction::Asc);
        if let Some(active) = filter.active {
            q = q.eq("active", active);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            q = q.ilike("name", format!("%{search}%"));
        }
        if let Some(limit) = filter.limit {
            q = q.limit(limit);
        }
        if let Some(offset) = filter.offset {
            q = q.offset(offset);
        }
        self.records.list(&q).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Zone>, StoreError> {
        self.records.get(id).await
    }

    pub async fn create(&self, fields: &ZoneFields) -> Result<Zone, StoreError> {
        self.records.create(fields).await
    }

    pub async fn replace(&self, id: &str, fields: &ZoneFields) -> Result<Option<Zone>, StoreError> {
        self.records.update(id, fields).await
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<Option<Zone>, StoreError> {
        self.records.update(id, &ActivePatch { active }).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.records.delete(id).await
    }
}

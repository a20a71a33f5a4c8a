// src/store/schedules.rs
use serde::{Deserialize, Serialize};

use crate::store::{Direction, Query, Records, Store, StoreError};

pub const TABLE: &str = "schedules";

/// A recurring show slot. `day_of_week` is 0 (Sunday) through 6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(deserialize_with = "crate::store::string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub zone_id: Option<String>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub capacity: Option<u32>,
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleFields {
    pub title: String,
    pub zone_id: Option<String>,
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub capacity: Option<u32>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub zone_id: Option<String>,
    pub day_of_week: Option<u8>,
    pub active: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
struct ActivePatch {
    active: bool,
}

pub struct ScheduleService<'a> {
    records: Records<'a, Schedule>,
}

impl<'a> ScheduleService<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            records: Records::new(store, TABLE),
        }
    }

    pub async fn list(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>, StoreError> {
        let mut q = Query::new().order_by("start_time", Direction::Asc);
        if let Some(zone_id) = &filter.zone_id {
            q = q.eq("zone_id", zone_id.as_str());
        }
        if let Some(day) = filter.day_of_week {
            q = q.eq("day_of_week", day);
        }
        if let Some(active) = filter.active {
            q = q.eq("active", active);
        }
        if let Some(limit) = filter.limit {
            q = q.limit(limit);
        }
        if let Some(offset) = filter.offset {
            q = q.offset(offset);
        }
        self.records.list(&q).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Schedule>, StoreError> {
        self.records.get(id).await
    }

    pub async fn create(&self, fields: &ScheduleFields) -> Result<Schedule, StoreError> {
        self.records.create(fields).await
    }

    pub async fn replace(&self, id: &str, fields: &ScheduleFields) -> Result<Option<Schedule>, StoreError> {
        self.records.update(id, fields).await
    }

    pub async fn set_active(&self, id: &str, active: bool) -> Result<Option<Schedule>, StoreError> {
        self.records.update(id, &ActivePatch { active }).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.records.delete(id).await
    }
}

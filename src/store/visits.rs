// src/store/visits.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::store::{Direction, Query, Records, Store, StoreError};

pub const TABLE: &str = "visits";

/// Visitor count recorded for one calendar day (optionally per zone).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    #[serde(deserialize_with = "crate::store::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub zone_id: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitFields {
    pub zone_id: Option<String>,
    pub date: String,
    pub count: u64,
}

pub struct VisitService<'a> {
    records: Records<'a, Visit>,
}

impl<'a> VisitService<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            records: Records::new(store, TABLE),
        }
    }

    /// Rows with `from <= date <= to`, oldest first.
    pub async fn between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Visit>, StoreError> {
        let q = Query::new()
            .gte("date", from.format("%Y-%m-%d").to_string())
            .lte("date", to.format("%Y-%m-%d").to_string())
            .order_by("date", Direction::Asc);
        self.records.list(&q).await
    }

    pub async fn record(&self, fields: &VisitFields) -> Result<Visit, StoreError> {
        self.records.create(fields).await
    }
}

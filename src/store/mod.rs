// src/store/mod.rs
//! Data access layer: a cloneable [`Store`] handle over a [`Backend`] plus one
//! thin service per entity. Services only build queries and wrap errors.

pub mod activities;
pub mod backend;
pub mod error;
pub mod memory;
pub mod news;
pub mod query;
pub mod rest;
pub mod reviews;
pub mod schedules;
pub mod visits;
pub mod zones;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::broadcast;

pub use backend::Backend;
pub use error::StoreError;
pub use memory::MemoryBackend;
pub use query::{Direction, Query, Row};
pub use rest::RestBackend;

use activities::ActivityService;
use news::NewsService;
use reviews::ReviewService;
use schedules::ScheduleService;
use visits::VisitService;
use zones::ZoneService;

const INSERT_BUS_CAPACITY: usize = 256;

/// Published after every successful insert made through this handle.
#[derive(Debug, Clone, PartialEq)]
pub struct RowInserted {
    pub table: String,
    pub row: Row,
}

/// Explicitly constructed store client, passed down through `AppState`.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
    inserts: broadcast::Sender<RowInserted>,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (inserts, _) = broadcast::channel(INSERT_BUS_CAPACITY);
        Self { backend, inserts }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn subscribe_inserts(&self) -> broadcast::Receiver<RowInserted> {
        self.inserts.subscribe()
    }

    pub fn activities(&self) -> ActivityService<'_> {
        ActivityService::new(self)
    }

    pub fn zones(&self) -> ZoneService<'_> {
        ZoneService::new(self)
    }

    pub fn schedules(&self) -> ScheduleService<'_> {
        ScheduleService::new(self)
    }

    pub fn news(&self) -> NewsService<'_> {
        NewsService::new(self)
    }

    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(self)
    }

    pub fn visits(&self) -> VisitService<'_> {
        VisitService::new(self)
    }

    pub(crate) async fn insert_row(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let stored = self.backend.insert(table, row).await?;
        // No subscribers is fine.
        let _ = self.inserts.send(RowInserted {
            table: table.to_string(),
            row: stored.clone(),
        });
        Ok(stored)
    }
}

pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Row, StoreError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode {
            message: format!("expected an object, got {other}"),
        }),
    }
}

pub(crate) fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    Ok(serde_json::from_value(serde_json::Value::Object(row))?)
}

/// Ids arrive as text or as bigint depending on the table.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string or number id, got {other}"))),
    }
}

/// Typed CRUD over one table; the per-entity services delegate here.
pub(crate) struct Records<'a, T> {
    store: &'a Store,
    table: &'static str,
    _marker: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Records<'a, T> {
    pub(crate) fn new(store: &'a Store, table: &'static str) -> Self {
        Self {
            store,
            table,
            _marker: PhantomData,
        }
    }

    /// Rows that do not decode are skipped so one bad row cannot fail the list.
    pub(crate) async fn list(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        let rows = self.store.backend.select(self.table, query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match from_row(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(target: "store", table = self.table, error = %e, "skipping undecodable row");
                    None
                }
            })
            .collect())
    }

    pub(crate) async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        let rows = self
            .store
            .backend
            .select(self.table, &Query::by_id(id).limit(1))
            .await?;
        rows.into_iter().next().map(from_row).transpose()
    }

    pub(crate) async fn create<I: Serialize>(&self, input: &I) -> Result<T, StoreError> {
        let row = self.store.insert_row(self.table, to_row(input)?).await?;
        from_row(row)
    }

    pub(crate) async fn update<I: Serialize>(&self, id: &str, patch: &I) -> Result<Option<T>, StoreError> {
        self.store
            .backend
            .update(self.table, id, to_row(patch)?)
            .await?
            .map(from_row)
            .transpose()
    }

    pub(crate) async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.backend.delete(self.table, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_skips_rows_that_do_not_decode() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(
            zones::TABLE,
            vec![
                json!({"id": "z1", "name": "Atrium"}),
                json!({"id": 7, "name": "Bronze Age"}),
                json!({"id": "z3"}),
                json!({"id": true, "name": "Broken id"}),
            ]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
        );
        let store = Store::new(backend);

        let zones = store.zones().list(&zones::ZoneFilter::default()).await.unwrap();
        let ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["z1", "7"]);

        let numeric = store.zones().get("7").await.unwrap().unwrap();
        assert_eq!(numeric.name, "Bronze Age");
    }
}

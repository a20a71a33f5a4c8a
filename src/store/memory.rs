// src/store/memory.rs
//! In-process backend used for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::auth::User;
use crate::store::backend::Backend;
use crate::store::error::StoreError;
use crate::store::query::{Query, Row};

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
    users: RwLock<HashMap<String, User>>,
    failures: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session token.
    pub fn with_user(self, token: &str, user: User) -> Self {
        self.add_user(token, user);
        self
    }

    pub fn add_user(&self, token: &str, user: User) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), user);
    }

    /// Insert rows verbatim (no id or timestamp stamping).
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Make the next `n` table or storage operations fail as if the provider were down.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<(String, Vec<u8>)> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&object_key(bucket, path))
            .cloned()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or(0, Vec::len)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        let claimed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match claimed {
            Ok(_) => Err(StoreError::Unavailable {
                message: "memory backend: simulated outage".to_string(),
            }),
            Err(_) => Ok(()),
        }
    }
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn object_key(bucket: &str, path: &str) -> String {
    format!("{bucket}/{path}")
}

fn row_id(row: &Row) -> Option<String> {
    match row.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let rows = tables.get(table).cloned().unwrap_or_default();
        Ok(query.apply(rows))
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        self.check_available()?;
        if row_id(&row).is_none() {
            row.insert("id".into(), Value::String(ulid::Ulid::new().to_string()));
        }
        row.entry("created_at")
            .or_insert_with(|| Value::String(now_stamp()));

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = tables.get_mut(table) else {
            return Ok(None);
        };
        let Some(row) = rows.iter_mut().find(|r| row_id(r).as_deref() == Some(id)) else {
            return Ok(None);
        };
        for (key, value) in patch {
            if key != "id" {
                row.insert(key, value);
            }
        }
        row.insert("updated_at".into(), Value::String(now_stamp()));
        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| row_id(r).as_deref() != Some(id));
        Ok(rows.len() != before)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.check_available()?;
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(object_key(bucket, path), (content_type.to_string(), bytes));
        Ok(format!("memory://{bucket}/{path}"))
    }

    // Sessions stay resolvable during simulated outages.
    async fn user_for_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_stamps_id_and_created_at() {
        let b = MemoryBackend::new();
        let stored = b.insert("zones", row(json!({"name": "Atrium"}))).await.unwrap();
        assert!(stored.get("id").and_then(Value::as_str).is_some());
        assert!(stored.get("created_at").is_some());
        assert_eq!(b.row_count("zones"), 1);
    }

    #[tokio::test]
    async fn update_merges_and_reports_missing() {
        let b = MemoryBackend::new();
        b.seed("zones", vec![row(json!({"id": "z1", "name": "Atrium", "active": true}))]);

        let updated = b
            .update("zones", "z1", row(json!({"active": false, "id": "hijack"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["active"], json!(false));
        assert_eq!(updated["id"], json!("z1"));
        assert_eq!(updated["name"], json!("Atrium"));

        let missing = b.update("zones", "nope", Row::new()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn simulated_outage_fails_exactly_n_calls() {
        let b = MemoryBackend::new();
        b.fail_next(2);
        assert!(b.select("zones", &Query::new()).await.is_err());
        assert!(b.select("zones", &Query::new()).await.is_err());
        assert!(b.select("zones", &Query::new()).await.is_ok());
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let b = MemoryBackend::new();
        b.seed("news", vec![row(json!({"id": "n1"}))]);
        assert!(b.delete("news", "n1").await.unwrap());
        assert!(!b.delete("news", "n1").await.unwrap());
    }
}

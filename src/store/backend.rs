// src/store/backend.rs
use crate::auth::User;
use crate::store::error::StoreError;
use crate::store::query::{Query, Row};

/// Minimal surface of the managed backend (tables, object storage, auth).
/// Everything above this trait is query construction and error wrapping.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Insert one row and return it as stored (with generated `id`/timestamps).
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Merge `patch` into the row with `id`. `Ok(None)` when no such row exists.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, StoreError>;

    /// `Ok(false)` when no such row exists.
    async fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError>;

    /// Store an object and return its public URL.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Resolve a session token to a user. `Ok(None)` for unknown/expired tokens.
    async fn user_for_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    fn name(&self) -> &'static str;
}

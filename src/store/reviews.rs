// src/store/reviews.rs
use serde::{Deserialize, Serialize};

use crate::store::{Direction, Query, Records, Store, StoreError};

pub const TABLE: &str = "reviews";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(deserialize_with = "crate::store::string_or_number")]
    pub id: String,
    pub visitor_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFields {
    pub visitor_name: String,
    pub rating: u8,
    pub comment: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub approved: Option<bool>,
    pub min_rating: Option<u8>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
struct ApprovalPatch {
    approved: bool,
}

pub struct ReviewService<'a> {
    records: Records<'a, Review>,
}

impl<'a> ReviewService<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            records: Records::new(store, TABLE),
        }
    }

    pub async fn list(&self, filter: &ReviewFilter) -> Result<Vec<Review>, StoreError> {
        let mut q = Query::new().order_by("created_at", Direction::Desc);
        if let Some(approved) = filter.approved {
            q = q.eq("approved", approved);
        }
        if let Some(min) = filter.min_rating {
            q = q.gte("rating", min);
        }
        if let Some(limit) = filter.limit {
            q = q.limit(limit);
        }
        if let Some(offset) = filter.offset {
            q = q.offset(offset);
        }
        self.records.list(&q).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Review>, StoreError> {
        self.records.get(id).await
    }

    pub async fn create(&self, fields: &ReviewFields) -> Result<Review, StoreError> {
        self.records.create(fields).await
    }

    pub async fn replace(&self, id: &str, fields: &ReviewFields) -> Result<Option<Review>, StoreError> {
        self.records.update(id, fields).await
    }

    pub async fn set_approved(&self, id: &str, approved: bool) -> Result<Option<Review>, StoreError> {
        self.records.update(id, &ApprovalPatch { approved }).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.records.delete(id).await
    }
}

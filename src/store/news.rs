// src/store/news.rs
use serde::{Deserialize, Serialize};

use crate::store::{Direction, Query, Records, Store, StoreError};

pub const TABLE: &str = "news";
pub const IMAGE_BUCKET: &str = "news-images";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(deserialize_with = "crate::store::string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsFields {
    pub title: String,
    pub summary: String,
    pub body: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published: bool,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsFilter {
    pub published: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Serialize)]
struct PublishPatch<'p> {
    published: bool,
    published_at: Option<&'p str>,
}

pub struct NewsService<'a> {
    records: Records<'a, NewsArticle>,
}

impl<'a> NewsService<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self {
            records: Records::new(store, TABLE),
        }
    }

    pub async fn list(&self, filter: &NewsFilter) -> Result<Vec<NewsArticle>, StoreError> {
        let mut q = Query::new().order_by("created_at", Direction::Desc);
        if let Some(published) = filter.published {
            q = q.eq("published", published);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            q = q.ilike("title", format!("%{search}%"));
        }
        if let Some(limit) = filter.limit {
            q = q.limit(limit);
        }
        if let Some(offset) = filter.offset {
            q = q.offset(offset);
        }
        self.records.list(&q).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<NewsArticle>, StoreError> {
        self.records.get(id).await
    }

    pub async fn create(&self, fields: &NewsFields) -> Result<NewsArticle, StoreError> {
        self.records.create(fields).await
    }

    pub async fn replace(&self, id: &str, fields: &NewsFields) -> Result<Option<NewsArticle>, StoreError> {
        self.records.update(id, fields).await
    }

    /// `published_at` is only meaningful while published; unpublishing clears it.
    pub async fn set_published(
        &self,
        id: &str,
        published: bool,
        published_at: Option<&str>,
    ) -> Result<Option<NewsArticle>, StoreError> {
        let patch = PublishPatch {
            published,
            published_at: if published { published_at } else { None },
        };
        self.records.update(id, &patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.records.delete(id).await
    }
}

// src/store/rest.rs
//! REST client for a hosted Postgres-as-a-service (PostgREST tables under
//! `/rest/v1`, object storage under `/storage/v1`, sessions under `/auth/v1`).

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::auth::User;
use crate::config::store::StoreConfig;
use crate::store::backend::Backend;
use crate::store::error::StoreError;
use crate::store::query::{Query, Row};

pub struct RestBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .user_agent(concat!("museum-dashboard/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let (Some(url), Some(key)) = (cfg.url.as_deref(), cfg.api_key.as_deref()) else {
            return Err(StoreError::Unavailable {
                message: "REST backend needs STORE_URL and STORE_API_KEY".to_string(),
            });
        };
        Self::new(url, key, cfg.timeout())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn with_key(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }
}

async fn check_status(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_rows(resp: Response) -> Result<Vec<Row>, StoreError> {
    let resp = check_status(resp).await?;
    Ok(resp.json::<Vec<Row>>().await?)
}

#[async_trait::async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        let rb = self.http.get(self.table_url(table)).query(&query.to_params());
        let resp = self.with_key(rb).send().await?;
        read_rows(resp).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let rb = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let resp = self.with_key(rb).send().await?;
        read_rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode {
                message: format!("insert into {table} returned no row"),
            })
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Option<Row>, StoreError> {
        let rb = self
            .http
            .patch(self.table_url(table))
            .query(&Query::by_id(id).to_params())
            .header("Prefer", "return=representation")
            .json(&patch);
        let resp = self.with_key(rb).send().await?;
        Ok(read_rows(resp).await?.into_iter().next())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        let rb = self
            .http
            .delete(self.table_url(table))
            .query(&Query::by_id(id).to_params())
            .header("Prefer", "return=representation");
        let resp = self.with_key(rb).send().await?;
        Ok(!read_rows(resp).await?.is_empty())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base_url);
        let rb = self
            .http
            .post(url)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        check_status(self.with_key(rb).send().await?).await?;
        Ok(format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.base_url
        ))
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let resp = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;
        if matches!(
            resp.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        Ok(Some(resp.json::<User>().await?))
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

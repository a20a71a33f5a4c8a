// src/auth.rs
//! Single-role authorization: a session belongs to an admin when the backend
//! user carries `role = "admin"` in its metadata.

use std::collections::HashMap;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::AppState;
use crate::error::AppError;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

impl User {
    pub fn with_role(id: &str, role: &str) -> Self {
        let mut user_metadata = Map::new();
        user_metadata.insert("role".into(), Value::String(role.to_string()));
        Self {
            id: id.to_string(),
            email: None,
            user_metadata,
        }
    }
}

pub fn is_authorized(user: &User) -> bool {
    user.user_metadata
        .get("role")
        .and_then(Value::as_str)
        .is_some_and(|role| role == ADMIN_ROLE)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").or_else(|| raw.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// `access_token` query parameter, for clients that cannot set headers
/// (browser `EventSource`). The value is percent-decoded.
fn query_token(uri: &Uri) -> Option<String> {
    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    let token = params.remove("access_token")?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Route layer guarding every admin endpoint. The resolved [`User`] is stored
/// in request extensions for handlers that want it.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .or_else(|| query_token(req.uri()))
        .ok_or(AppError::Unauthorized)?;
    let user = state
        .store
        .backend()
        .user_for_token(&token)
        .await
        .map_err(AppError::upstream("verifying the session"))?
        .ok_or(AppError::Unauthorized)?;

    if !is_authorized(&user) {
        tracing::warn!(target: "auth", user_id = %user.id, "non-admin session rejected");
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

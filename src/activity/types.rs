// src/activity/types.rs
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::store::Row;

/// Closed set of feed categories. Upstream uses a wider vocabulary which is
/// collapsed through [`EventKind::from_upstream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Visit,
    Show,
    News,
    Content,
}

impl EventKind {
    pub fn from_upstream(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "visit" | "visitor" | "ticket" => EventKind::Visit,
            "show" | "schedule" | "performance" => EventKind::Show,
            "news" | "article" => EventKind::News,
            // content, zone, section, user, system, review and anything unknown
            _ => EventKind::Content,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Visit => "visit",
            EventKind::Show => "show",
            EventKind::News => "news",
            EventKind::Content => "content",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

/// One entry of the activity feed.
///
/// `is_recent` is derived from `occurred_at` at read time; the stored value is
/// whatever was last computed and carries no meaning inside the feed buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    pub kind: EventKind,
    pub title: String,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub is_recent: bool,
    #[serde(default)]
    pub source_metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushPayloadError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("unparsable timestamp `{0}`")]
    InvalidTimestamp(String),
}

impl ActivityEvent {
    /// Build an event from an upstream row (batch fetch or push payload).
    pub fn from_row(row: &Row) -> Result<Self, PushPayloadError> {
        let id = match row.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(PushPayloadError::MissingField("id")),
        };

        let raw_ts = ["occurred_at", "created_at", "occurredAt"]
            .iter()
            .find_map(|k| row.get(*k).and_then(Value::as_str))
            .ok_or(PushPayloadError::MissingField("occurred_at"))?;
        let occurred_at = DateTime::parse_from_rfc3339(raw_ts)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| PushPayloadError::InvalidTimestamp(raw_ts.to_string()))?;

        let kind = ["kind", "category"]
            .iter()
            .find_map(|k| row.get(*k).and_then(Value::as_str))
            .map_or(EventKind::Content, EventKind::from_upstream);

        let priority = row
            .get("priority")
            .and_then(Value::as_str)
            .and_then(Priority::parse);

        let source_metadata = ["metadata", "sourceMetadata"]
            .iter()
            .find_map(|k| row.get(*k).and_then(Value::as_object))
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            id,
            kind,
            title: text(row, "title"),
            description: text(row, "description"),
            occurred_at,
            priority,
            is_recent: false,
            source_metadata,
        })
    }

    /// Future timestamps count as recent.
    pub fn recent_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX);
        now.signed_duration_since(self.occurred_at) <= window
    }

    pub fn with_recency(mut self, now: DateTime<Utc>, window: Duration) -> Self {
        self.is_recent = self.recent_at(now, window);
        self
    }
}

fn text(row: &Row, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Push subscription state as seen by readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Live,
    Historical,
}

// src/activity/realtime.rs
//! Push side of the feed: a subscription yielding inserted activity rows, and
//! the reconnect loop feeding them into the synchronizer.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::activity::sync::FeedSynchronizer;
use crate::activity::types::ConnectionState;
use crate::store::{activities, Row, RowInserted, Store};

#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    Row(Row),
    /// The subscriber fell behind and `n` messages were skipped.
    Lagged(u64),
}

#[derive(Debug, Clone, Error)]
pub enum SubscribeError {
    #[error("push channel unavailable: {0}")]
    Unavailable(String),
}

pub type PushStream = BoxStream<'static, PushMessage>;

#[async_trait::async_trait]
pub trait PushChannel: Send + Sync {
    /// A stream that ends when the subscription drops.
    async fn subscribe(&self) -> Result<PushStream, SubscribeError>;
}

/// Activity rows that visitors may see. Rows without the flag count as public.
pub fn is_public_activity(inserted: &RowInserted) -> bool {
    inserted.table == activities::TABLE
        && inserted.row.get("is_public").and_then(Value::as_bool) != Some(false)
}

/// Listens on the store's insert bus.
pub struct StorePushChannel {
    store: Store,
}

impl StorePushChannel {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl PushChannel for StorePushChannel {
    async fn subscribe(&self) -> Result<PushStream, SubscribeError> {
        let stream = BroadcastStream::new(self.store.subscribe_inserts()).filter_map(|item| async move {
            match item {
                Ok(inserted) if is_public_activity(&inserted) => Some(PushMessage::Row(inserted.row)),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(n)) => Some(PushMessage::Lagged(n)),
            }
        });
        Ok(stream.boxed())
    }
}

/// Runs until aborted. Every lost or failed subscription flips the feed to
/// `Historical` and waits `reconnect_delay` before the next attempt.
pub async fn run_push_loop(
    sync: Arc<FeedSynchronizer>,
    channel: Arc<dyn PushChannel>,
    reconnect_delay: Duration,
) {
    let mut reconnecting = false;
    loop {
        match channel.subscribe().await {
            Ok(mut stream) => {
                sync.set_connection_state(ConnectionState::Live);
                if reconnecting {
                    // Catch up on whatever was inserted while disconnected.
                    if let Err(e) = sync.refresh(true).await {
                        tracing::warn!(target: "activity_feed", error = %e, "catch-up refresh failed");
                    }
                }
                while let Some(msg) = stream.next().await {
                    match msg {
                        PushMessage::Row(row) => {
                            sync.on_push_event(&row);
                        }
                        PushMessage::Lagged(skipped) => {
                            tracing::warn!(target: "activity_feed", skipped, "push subscriber lagged; refreshing");
                            if let Err(e) = sync.refresh(true).await {
                                tracing::warn!(target: "activity_feed", error = %e, "lag refresh failed");
                            }
                        }
                    }
                }
                tracing::warn!(target: "activity_feed", "push subscription closed");
            }
            Err(e) => {
                tracing::warn!(target: "activity_feed", error = %e, "push subscribe failed");
            }
        }

        sync.set_connection_state(ConnectionState::Historical);
        counter!("feed_reconnects_total").increment(1);
        reconnecting = true;
        tokio::time::sleep(reconnect_delay).await;
    }
}

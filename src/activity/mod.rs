// src/activity/mod.rs
pub mod cache;
pub mod feed;
pub mod realtime;
pub mod runtime;
pub mod source;
pub mod sync;
pub mod types;

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

pub use cache::{CachedSnapshot, FileSnapshotCache, MemorySnapshotCache, SnapshotCache};
pub use feed::{FeedBuffer, Upsert};
pub use realtime::{PushChannel, PushMessage, StorePushChannel, SubscribeError};
pub use runtime::FeedRuntime;
pub use source::{ActivitySource, FetchError, StoreActivitySource};
pub use sync::{FeedStatus, FeedSynchronizer, PushOutcome, RefreshOutcome};
pub use types::{ActivityEvent, ConnectionState, EventKind, Priority, PushPayloadError};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_refresh_total", "Feed refresh attempts by outcome.");
        describe_counter!("feed_push_total", "Realtime activity payloads by outcome.");
        describe_counter!(
            "feed_reconnects_total",
            "Push subscription reconnect attempts."
        );
        describe_gauge!("feed_events", "Events currently held in the activity feed.");
    });
}

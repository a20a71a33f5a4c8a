//! Demo that runs the activity feed against the in-memory store: a few admin
//! actions are recorded and the resulting feed is printed.

use std::sync::Arc;

use museum_dashboard::activity::{FeedRuntime, MemorySnapshotCache, StorePushChannel};
use museum_dashboard::config::FeedConfig;
use museum_dashboard::store::activities::NewActivity;
use museum_dashboard::store::{MemoryBackend, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(true).init();

    let store = Store::new(Arc::new(MemoryBackend::new()));
    let feed_cfg = FeedConfig {
        max_events: 3,
        ..FeedConfig::default()
    };
    let state = museum_dashboard::app_with(store.clone(), Arc::new(MemorySnapshotCache::new()), feed_cfg);
    let runtime = FeedRuntime::spawn(state.feed.clone(), Arc::new(StorePushChannel::new(store.clone())));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let actions = [
        ("zone", "New zone: Bronze Age"),
        ("schedule", "New show scheduled: Night at the museum"),
        ("news", "Extended opening hours"),
        ("ticket", "Group of 30 checked in"),
    ];
    for (kind, title) in actions {
        store.activities().create(&NewActivity::new(kind, title, "")).await?;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    for ev in state.feed.current_feed() {
        println!("{} [{}] {} (recent: {})", ev.occurred_at, ev.kind.as_str(), ev.title, ev.is_recent);
    }
    println!("connection: {:?}", state.feed.connection_state());

    runtime.shutdown();
    println!("feed-demo done");
    Ok(())
}

// src/activity/runtime.rs
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::activity::realtime::{run_push_loop, PushChannel};
use crate::activity::sync::FeedSynchronizer;

/// Background tasks keeping the feed current. Both are aborted on
/// [`FeedRuntime::shutdown`] or when the runtime handle is dropped.
pub struct FeedRuntime {
    refresh: JoinHandle<()>,
    push: JoinHandle<()>,
}

impl FeedRuntime {
    pub fn spawn(sync: Arc<FeedSynchronizer>, channel: Arc<dyn PushChannel>) -> Self {
        let interval = sync.config().refresh_interval();
        let reconnect_delay = sync.config().reconnect_delay();

        let periodic = sync.clone();
        let refresh = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut initial = true;
            loop {
                ticker.tick().await;
                // The first tick fires immediately and always hits the network.
                let force = std::mem::take(&mut initial);
                if let Err(e) = periodic.refresh_with_retry(force).await {
                    tracing::warn!(target: "activity_feed", error = %e, "scheduled refresh gave up");
                }
            }
        });

        let push = tokio::spawn(run_push_loop(sync, channel, reconnect_delay));

        tracing::info!(target: "activity_feed", ?interval, "feed runtime started");
        Self { refresh, push }
    }

    pub fn shutdown(&self) {
        self.refresh.abort();
        self.push.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.refresh.is_finished() || !self.push.is_finished()
    }
}

impl Drop for FeedRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::realtime::StorePushChannel;
    use crate::activity::sync::tests::{row, NoCache, ScriptedSource};
    use crate::config::FeedConfig;
    use crate::store::{MemoryBackend, Store};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_start_and_every_interval_until_shutdown() {
        let source = Arc::new(ScriptedSource::default().then(0, Ok(vec![row("a", 1)])));
        let sync = Arc::new(FeedSynchronizer::new(source.clone(), Arc::new(NoCache), FeedConfig::default()));
        let store = Store::new(Arc::new(MemoryBackend::new()));

        let rt = FeedRuntime::spawn(sync.clone(), Arc::new(StorePushChannel::new(store)));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(sync.current_feed().len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 2);

        rt.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!rt.is_running());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 2);
    }
}

// src/activity/sync.rs
//! The feed synchronizer: merges batch fetches, realtime pushes and the
//! fallback snapshot into one [`FeedBuffer`].
//!
//! All state lives behind one mutex that is never held across an await.
//! Every refresh takes a sequence number when it starts; a completion whose
//! number is no longer the latest is discarded, which is also how
//! re-initialization cancels in-flight work.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::time::Instant;

use crate::activity::cache::{CachedSnapshot, SnapshotCache};
use crate::activity::feed::{FeedBuffer, Upsert};
use crate::activity::source::{ActivitySource, FetchError};
use crate::activity::types::{ActivityEvent, ConnectionState, PushPayloadError};
use crate::config::FeedConfig;
use crate::store::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshOutcome {
    /// Live data replaced the feed.
    Fetched,
    /// Skipped: a refresh succeeded within the debounce window.
    Debounced,
    /// Live fetch failed; the feed was filled from a fresh snapshot.
    Recovered,
    /// A newer refresh (or re-initialization) started meanwhile; result dropped.
    Superseded,
}

impl RefreshOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RefreshOutcome::Fetched => "fetched",
            RefreshOutcome::Debounced => "debounced",
            RefreshOutcome::Recovered => "recovered",
            RefreshOutcome::Superseded => "superseded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Applied(Upsert),
    Dropped(PushPayloadError),
}

/// Read model served to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub events: Vec<ActivityEvent>,
    pub total: usize,
    pub connection: ConnectionState,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub warning: Option<String>,
}

#[derive(Debug)]
struct State {
    feed: FeedBuffer,
    recency_window: Duration,
    latest_seq: u64,
    last_success: Option<Instant>,
    last_refresh_at: Option<DateTime<Utc>>,
    warning: Option<String>,
    connection: ConnectionState,
}

pub struct FeedSynchronizer {
    source: Arc<dyn ActivitySource>,
    cache: Arc<dyn SnapshotCache>,
    config: FeedConfig,
    state: Mutex<State>,
}

impl FeedSynchronizer {
    /// Starts initialized with the configured bounds and an empty feed.
    pub fn new(source: Arc<dyn ActivitySource>, cache: Arc<dyn SnapshotCache>, config: FeedConfig) -> Self {
        crate::activity::ensure_metrics_described();
        let state = State {
            feed: FeedBuffer::with_capacity(config.max_events),
            recency_window: config.recency_window(),
            latest_seq: 0,
            last_success: None,
            last_refresh_at: None,
            warning: None,
            connection: ConnectionState::Historical,
        };
        Self {
            source,
            cache,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset to an empty feed with new bounds. Refreshes still in flight will
    /// complete as [`RefreshOutcome::Superseded`]. Connection state is kept
    /// since it belongs to the push task, not the feed.
    pub fn initialize(&self, max_events: usize, recency_window_secs: u64) {
        let mut st = self.lock();
        st.feed = FeedBuffer::with_capacity(max_events);
        st.recency_window = Duration::from_secs(recency_window_secs);
        st.latest_seq += 1;
        st.last_success = None;
        st.last_refresh_at = None;
        st.warning = None;
        gauge!("feed_events").set(0.0);
    }

    pub async fn refresh(&self, force: bool) -> Result<RefreshOutcome, FetchError> {
        let result = self.refresh_inner(force).await;
        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "failed",
        };
        counter!("feed_refresh_total", "outcome" => label).increment(1);
        result
    }

    async fn refresh_inner(&self, force: bool) -> Result<RefreshOutcome, FetchError> {
        let (seq, limit) = {
            let mut st = self.lock();
            if !force {
                if let Some(at) = st.last_success {
                    if at.elapsed() < self.config.debounce() {
                        tracing::debug!(target: "activity_feed", "refresh debounced");
                        return Ok(RefreshOutcome::Debounced);
                    }
                }
            }
            st.latest_seq += 1;
            (st.latest_seq, st.feed.capacity())
        };

        let timeout = self.config.fetch_timeout();
        let fetched = match tokio::time::timeout(timeout, self.source.fetch_recent(limit)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        match fetched {
            Ok(rows) => self.apply_fetch(seq, rows).await,
            Err(err) => self.recover(seq, err).await,
        }
    }

    async fn apply_fetch(&self, seq: u64, rows: Vec<Row>) -> Result<RefreshOutcome, FetchError> {
        let events: Vec<ActivityEvent> = rows
            .iter()
            .filter_map(|row| match ActivityEvent::from_row(row) {
                Ok(ev) => Some(ev),
                Err(e) => {
                    tracing::warn!(target: "activity_feed", error = %e, "skipping malformed activity row");
                    None
                }
            })
            .collect();

        let snapshot = {
            let mut st = self.lock();
            if st.latest_seq != seq {
                tracing::debug!(target: "activity_feed", seq, latest = st.latest_seq, "stale refresh discarded");
                return Ok(RefreshOutcome::Superseded);
            }
            st.feed.replace(events);
            st.last_success = Some(Instant::now());
            st.last_refresh_at = Some(Utc::now());
            st.warning = None;
            gauge!("feed_events").set(st.feed.len() as f64);
            CachedSnapshot::new(st.feed.events().to_vec(), Utc::now().timestamp_millis())
        };

        tracing::info!(target: "activity_feed", events = snapshot.total, "feed refreshed");
        self.cache.store(&snapshot).await;
        Ok(RefreshOutcome::Fetched)
    }

    async fn recover(&self, seq: u64, err: FetchError) -> Result<RefreshOutcome, FetchError> {
        tracing::warn!(target: "activity_feed", error = %err, "activity fetch failed");

        let max_age = self.config.cache_max_age();
        let now_ms = Utc::now().timestamp_millis();
        let snapshot = self.cache.load().await.filter(|s| s.is_fresh(now_ms, max_age));

        let mut st = self.lock();
        if st.latest_seq != seq {
            return Ok(RefreshOutcome::Superseded);
        }
        match snapshot {
            Some(snap) => {
                let age_ms = snap.age_ms(now_ms);
                let added = st.feed.fill_missing(snap.events);
                gauge!("feed_events").set(st.feed.len() as f64);
                tracing::info!(
                    target: "activity_feed",
                    added,
                    age_ms,
                    "feed recovered from snapshot"
                );
                Ok(RefreshOutcome::Recovered)
            }
            None => {
                st.warning = Some(warning_for(&err).to_string());
                Err(err)
            }
        }
    }

    /// One automatic retry after the configured backoff, and only if the feed
    /// is still empty by then.
    pub async fn refresh_with_retry(&self, force: bool) -> Result<RefreshOutcome, FetchError> {
        match self.refresh(force).await {
            Err(err) => {
                let backoff = self.config.retry_backoff();
                tracing::info!(target: "activity_feed", ?backoff, "scheduling refresh retry");
                tokio::time::sleep(backoff).await;
                let still_empty = self.lock().feed.is_empty();
                if still_empty {
                    self.refresh(true).await
                } else {
                    Err(err)
                }
            }
            ok => ok,
        }
    }

    pub fn on_push_event(&self, payload: &Row) -> PushOutcome {
        let event = match ActivityEvent::from_row(payload) {
            Ok(ev) => ev,
            Err(e) => {
                tracing::warn!(target: "activity_feed", error = %e, "dropping malformed push payload");
                counter!("feed_push_total", "outcome" => "dropped").increment(1);
                return PushOutcome::Dropped(e);
            }
        };

        let mut st = self.lock();
        let applied = st.feed.upsert(event);
        gauge!("feed_events").set(st.feed.len() as f64);
        let label = match applied {
            Upsert::Inserted => "inserted",
            Upsert::Replaced => "replaced",
            Upsert::Evicted(_) => "evicted",
            Upsert::Rejected => "rejected",
        };
        counter!("feed_push_total", "outcome" => label).increment(1);
        PushOutcome::Applied(applied)
    }

    pub fn current_feed(&self) -> Vec<ActivityEvent> {
        self.current_feed_at(Utc::now())
    }

    pub fn current_feed_at(&self, now: DateTime<Utc>) -> Vec<ActivityEvent> {
        let st = self.lock();
        let window = st.recency_window;
        st.feed
            .events()
            .iter()
            .cloned()
            .map(|ev| ev.with_recency(now, window))
            .collect()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.lock().connection
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        let mut st = self.lock();
        if st.connection != state {
            tracing::info!(target: "activity_feed", ?state, "push connection state changed");
        }
        st.connection = state;
    }

    pub fn status(&self) -> FeedStatus {
        let events = self.current_feed();
        let st = self.lock();
        FeedStatus {
            total: events.len(),
            events,
            connection: st.connection,
            last_refresh_at: st.last_refresh_at,
            warning: st.warning.clone(),
        }
    }

    pub fn warning(&self) -> Option<String> {
        self.lock().warning.clone()
    }

    pub fn dismiss_warning(&self) {
        self.lock().warning = None;
    }
}

/// Client-facing text for a failed refresh. Provider detail stays in the logs.
fn warning_for(err: &FetchError) -> &'static str {
    match err {
        FetchError::Timeout(_) => "Activity feed timed out; showing last known data.",
        FetchError::Upstream(_) => "Activity feed could not be refreshed; showing last known data.",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::activity::cache::MemorySnapshotCache;
    use crate::activity::feed::tests::{at, ev};
    use serde_json::json;
    use std::collections::{HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Scripted = (Duration, Result<Vec<Row>, FetchError>);

    /// Answers fetches from a queue; an exhausted queue answers with no rows.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Scripted>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn then(self, delay_secs: u64, res: Result<Vec<Row>, FetchError>) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back((Duration::from_secs(delay_secs), res));
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ActivitySource for ScriptedSource {
        async fn fetch_recent(&self, _limit: usize) -> Result<Vec<Row>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let (delay, res) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            res
        }
    }

    /// Never holds anything.
    pub(crate) struct NoCache;

    #[async_trait::async_trait]
    impl SnapshotCache for NoCache {
        async fn load(&self) -> Option<CachedSnapshot> {
            None
        }
        async fn store(&self, _snapshot: &CachedSnapshot) {}
    }

    pub(crate) fn row(id: &str, secs: i64) -> Row {
        json!({
            "id": id,
            "kind": "news",
            "title": format!("title {id}"),
            "created_at": at(secs).to_rfc3339(),
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn down() -> Result<Vec<Row>, FetchError> {
        Err(FetchError::Upstream("store down".into()))
    }

    fn sync_with(source: Arc<ScriptedSource>, cache: Arc<dyn SnapshotCache>, max: usize) -> FeedSynchronizer {
        let cfg = FeedConfig {
            max_events: max,
            ..FeedConfig::default()
        };
        FeedSynchronizer::new(source, cache, cfg)
    }

    fn ids(sync: &FeedSynchronizer) -> Vec<String> {
        sync.current_feed().into_iter().map(|e| e.id).collect()
    }

    fn assert_invariants(feed: &[ActivityEvent], max: usize) {
        let unique: HashSet<_> = feed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(unique.len(), feed.len(), "duplicate ids in feed");
        assert!(feed.windows(2).all(|w| w[0].occurred_at >= w[1].occurred_at), "feed not sorted");
        assert!(feed.len() <= max, "feed over capacity");
    }

    #[test]
    fn empty_before_any_refresh() {
        let sync = sync_with(Arc::new(ScriptedSource::default()), Arc::new(NoCache), 5);
        assert!(sync.current_feed().is_empty());
        assert_eq!(sync.connection_state(), ConnectionState::Historical);
    }

    #[tokio::test(start_paused = true)]
    async fn invariants_hold_across_refresh_and_push() {
        let batch: Vec<Row> = (0..12).map(|i| row(&format!("e{}", i % 8), (i * 37) % 50)).collect();
        let source = Arc::new(ScriptedSource::default().then(0, Ok(batch.clone())).then(0, Ok(batch)));
        let sync = sync_with(source, Arc::new(NoCache), 6);

        sync.refresh(true).await.unwrap();
        assert_invariants(&sync.current_feed(), 6);

        for i in 0..120i64 {
            sync.on_push_event(&row(&format!("e{}", i % 13), (i * 7919) % 100));
            assert_invariants(&sync.current_feed(), 6);
        }

        sync.refresh(true).await.unwrap();
        assert_invariants(&sync.current_feed(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn second_refresh_within_debounce_is_a_no_op() {
        let source = Arc::new(ScriptedSource::default().then(0, Ok(vec![row("a", 1)])));
        let sync = sync_with(source.clone(), Arc::new(NoCache), 5);

        assert_eq!(sync.refresh(false).await, Ok(RefreshOutcome::Fetched));
        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(sync.refresh(false).await, Ok(RefreshOutcome::Debounced));
        assert_eq!(source.calls(), 1);

        // forced refreshes ignore the window
        assert_eq!(sync.refresh(true).await, Ok(RefreshOutcome::Fetched));
        assert_eq!(source.calls(), 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(sync.refresh(false).await, Ok(RefreshOutcome::Fetched));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_does_not_start_debounce() {
        let source = Arc::new(ScriptedSource::default().then(0, down()).then(0, Ok(vec![row("a", 1)])));
        let sync = sync_with(source.clone(), Arc::new(NoCache), 5);

        assert!(sync.refresh(false).await.is_err());
        assert_eq!(sync.refresh(false).await, Ok(RefreshOutcome::Fetched));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_recovers_from_fresh_snapshot() {
        let snap = CachedSnapshot::new(vec![ev("c1", 9), ev("c2", 3)], Utc::now().timestamp_millis() - 60_000);
        let cache = Arc::new(MemorySnapshotCache::with_snapshot(snap));
        let source = Arc::new(ScriptedSource::default().then(0, down()));
        let sync = sync_with(source, cache, 5);

        assert_eq!(sync.refresh(false).await, Ok(RefreshOutcome::Recovered));
        assert_eq!(ids(&sync), vec!["c1", "c2"]);
        assert!(sync.warning().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_snapshot_is_ignored() {
        let snap = CachedSnapshot::new(vec![ev("old", 1)], Utc::now().timestamp_millis() - 301_000);
        let cache = Arc::new(MemorySnapshotCache::with_snapshot(snap));
        let source = Arc::new(ScriptedSource::default().then(0, down()));
        let sync = sync_with(source, cache, 5);

        assert!(matches!(sync.refresh(false).await, Err(FetchError::Upstream(_))));
        assert!(sync.current_feed().is_empty());
        assert!(sync.warning().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_refresh_overwrites_snapshot() {
        let cache = Arc::new(MemorySnapshotCache::new());
        let source = Arc::new(ScriptedSource::default().then(0, Ok(vec![row("a", 1), row("b", 2)])));
        let sync = sync_with(source, cache.clone(), 5);

        sync.refresh(false).await.unwrap();
        let snap = cache.load().await.unwrap();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.events[0].id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_without_cache_retries_exactly_once() {
        let source = Arc::new(ScriptedSource::default().then(0, down()).then(0, down()).then(0, down()));
        let sync = sync_with(source.clone(), Arc::new(NoCache), 5);

        let started = Instant::now();
        let res = sync.refresh_with_retry(false).await;
        assert!(res.is_err());
        assert_eq!(source.calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(sync.current_feed().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_can_succeed_and_clears_warning() {
        let source = Arc::new(ScriptedSource::default().then(0, down()).then(0, Ok(vec![row("a", 1)])));
        let sync = sync_with(source.clone(), Arc::new(NoCache), 5);

        assert_eq!(sync.refresh_with_retry(false).await, Ok(RefreshOutcome::Fetched));
        assert_eq!(ids(&sync), vec!["a"]);
        assert!(sync.warning().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn no_retry_when_feed_already_has_data() {
        let source = Arc::new(ScriptedSource::default().then(0, Ok(vec![row("a", 1)])).then(0, down()));
        let sync = sync_with(source.clone(), Arc::new(NoCache), 5);

        sync.refresh(false).await.unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(sync.refresh_with_retry(false).await.is_err());
        assert_eq!(source.calls(), 2);
        assert_eq!(ids(&sync), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_timeout_is_a_failure() {
        let source = Arc::new(ScriptedSource::default().then(60, Ok(vec![row("late", 1)])));
        let sync = sync_with(source, Arc::new(NoCache), 5);

        assert_eq!(
            sync.refresh(false).await,
            Err(FetchError::Timeout(Duration::from_secs(10)))
        );
        assert!(sync.current_feed().is_empty());
        assert_eq!(
            sync.warning().as_deref(),
            Some("Activity feed timed out; showing last known data.")
        );
    }

    #[test]
    fn push_with_existing_id_replaces_in_place() {
        let sync = sync_with(Arc::new(ScriptedSource::default()), Arc::new(NoCache), 5);
        sync.on_push_event(&row("a", 10));
        sync.on_push_event(&row("b", 5));

        let mut edited = row("b", 5);
        edited.insert("title".into(), json!("edited"));
        assert_eq!(sync.on_push_event(&edited), PushOutcome::Applied(Upsert::Replaced));

        let feed = sync.current_feed();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[1].id, "b");
        assert_eq!(feed[1].title, "edited");
    }

    #[test]
    fn malformed_push_leaves_feed_unchanged() {
        let sync = sync_with(Arc::new(ScriptedSource::default()), Arc::new(NoCache), 5);
        sync.on_push_event(&row("a", 10));
        let before = sync.current_feed();

        let mut no_id = row("x", 20);
        no_id.remove("id");
        assert_eq!(
            sync.on_push_event(&no_id),
            PushOutcome::Dropped(PushPayloadError::MissingField("id"))
        );

        let mut bad_ts = row("y", 20);
        bad_ts.insert("created_at".into(), json!("not a date"));
        assert!(matches!(sync.on_push_event(&bad_ts), PushOutcome::Dropped(_)));

        assert_eq!(sync.current_feed(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn push_newer_event_into_full_feed() {
        let source = Arc::new(ScriptedSource::default().then(0, Ok(vec![row("A", 10), row("B", 5)])));
        let sync = sync_with(source, Arc::new(NoCache), 2);
        sync.refresh(false).await.unwrap();

        sync.on_push_event(&row("C", 20));
        assert_eq!(ids(&sync), vec!["C", "A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_refresh_completion_is_discarded() {
        let source = Arc::new(
            ScriptedSource::default()
                .then(5, Ok(vec![row("first", 1)]))
                .then(1, Ok(vec![row("second", 2)])),
        );
        let sync = Arc::new(sync_with(source, Arc::new(NoCache), 5));

        let s1 = sync.clone();
        let first = tokio::spawn(async move { s1.refresh(false).await });
        tokio::task::yield_now().await;
        let second = sync.refresh(true).await;

        assert_eq!(second, Ok(RefreshOutcome::Fetched));
        assert_eq!(first.await.unwrap(), Ok(RefreshOutcome::Superseded));
        assert_eq!(ids(&sync), vec!["second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reinitialize_cancels_in_flight_refresh() {
        let source = Arc::new(ScriptedSource::default().then(5, Ok(vec![row("a", 1)])));
        let sync = Arc::new(sync_with(source, Arc::new(NoCache), 5));
        sync.on_push_event(&row("pushed", 3));

        let s1 = sync.clone();
        let pending = tokio::spawn(async move { s1.refresh(false).await });
        tokio::task::yield_now().await;
        sync.initialize(3, 30);

        assert_eq!(pending.await.unwrap(), Ok(RefreshOutcome::Superseded));
        assert!(sync.current_feed().is_empty());
    }

    #[test]
    fn recency_is_recomputed_on_read() {
        let sync = sync_with(Arc::new(ScriptedSource::default()), Arc::new(NoCache), 5);
        sync.on_push_event(&row("a", 0));

        assert!(sync.current_feed_at(at(10))[0].is_recent);
        assert!(!sync.current_feed_at(at(31))[0].is_recent);
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_warning_keeps_data() {
        let source = Arc::new(
            ScriptedSource::default()
                .then(0, Ok(vec![row("a", 1)]))
                .then(0, down()),
        );
        let sync = sync_with(source, Arc::new(NoCache), 5);
        sync.refresh(false).await.unwrap();
        assert!(sync.refresh(true).await.is_err());

        let status = sync.status();
        assert_eq!(
            status.warning.as_deref(),
            Some("Activity feed could not be refreshed; showing last known data.")
        );
        assert!(!status.warning.unwrap_or_default().contains("store down"));
        assert_eq!(status.total, 1);

        sync.dismiss_warning();
        assert!(sync.status().warning.is_none());
        assert_eq!(ids(&sync), vec!["a"]);
    }
}

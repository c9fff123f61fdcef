use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pulse_api_types::{
    AudienceSegment, Campaign, ChannelPerformance, Collection, MetricsBundle, RevenuePoint,
};
use pulse_client::retry::RetryPolicy;
use pulse_client::scheduler::{RefreshPolicy, RefreshScheduler, Snapshot};
use pulse_client::synthetic::{dataset, FaultInjection, SyntheticDataSource};
use pulse_client::{CollectionData, DataOrigin, DataSource, FetchError, ModeSwitch, ResilientDataService};
use pulse_core::config::FetchMode;
use tokio::sync::oneshot;

// ===========================================================================
// Test doubles
// ===========================================================================

/// Remote whose campaign calls block until the test opens their gate.
/// Other collections answer immediately with reference data.
#[derive(Default)]
struct GatedSource {
    script: Mutex<VecDeque<(oneshot::Receiver<()>, Vec<Campaign>)>>,
    calls: AtomicUsize,
}

impl GatedSource {
    /// Queue a response; returns the sender that releases it.
    fn push(&self, rows: Vec<Campaign>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().push_back((rx, rows));
        tx
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for GatedSource {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn revenue(&self) -> Result<Vec<RevenuePoint>, FetchError> {
        Ok(dataset::revenue())
    }

    async fn channels(&self) -> Result<Vec<ChannelPerformance>, FetchError> {
        Ok(dataset::channels())
    }

    async fn audience(&self) -> Result<Vec<AudienceSegment>, FetchError> {
        Ok(dataset::audience())
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, FetchError> {
        let next = self.script.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((gate, rows)) = next else {
            return Err(FetchError::Network("script exhausted".into()));
        };
        let _ = gate.await;
        Ok(rows)
    }

    async fn metrics(&self) -> Result<MetricsBundle, FetchError> {
        Ok(dataset::metrics())
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

fn live_scheduler(remote: Arc<GatedSource>) -> RefreshScheduler {
    let service = ResilientDataService::new(
        remote,
        Arc::new(SyntheticDataSource::new()),
        ModeSwitch::new(FetchMode::Live),
    );
    RefreshScheduler::new(Arc::new(service)).with_policy(
        Collection::Campaigns,
        RefreshPolicy::for_collection(Collection::Campaigns).with_retry(RetryPolicy::none()),
    )
}

fn mock_scheduler(synthetic: SyntheticDataSource) -> RefreshScheduler {
    let service = ResilientDataService::new(
        Arc::new(SyntheticDataSource::new()),
        Arc::new(synthetic),
        ModeSwitch::new(FetchMode::Mock),
    );
    RefreshScheduler::new(Arc::new(service))
}

async fn wait_for_calls(source: &GatedSource, n: usize) {
    while source.calls() < n {
        tokio::task::yield_now().await;
    }
}

async fn next_snapshot(rx: &flume::Receiver<Snapshot>) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
        .await
        .expect("snapshot within timeout")
        .expect("channel open")
}

fn campaign_ids(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .data
        .campaigns()
        .unwrap_or_default()
        .iter()
        .map(|c| c.id.clone())
        .collect()
}

// ===========================================================================
// Ordering
// ===========================================================================

#[tokio::test]
async fn late_result_from_earlier_refresh_is_discarded() {
    let source = Arc::new(GatedSource::default());
    let all = dataset::campaigns();
    let first_gate = source.push(all[..1].to_vec());
    let second_gate = source.push(all[..2].to_vec());
    let scheduler = live_scheduler(source.clone());

    let s1 = scheduler.clone();
    let first = tokio::spawn(async move { s1.refresh(Collection::Campaigns).await });
    wait_for_calls(&source, 1).await;

    let s2 = scheduler.clone();
    let second = tokio::spawn(async move { s2.refresh(Collection::Campaigns).await });
    wait_for_calls(&source, 2).await;

    // The second-issued request finishes first.
    second_gate.send(()).unwrap();
    let applied = second.await.unwrap().unwrap().expect("second result applied");
    assert_eq!(applied.seq, 2);

    first_gate.send(()).unwrap();
    let discarded = first.await.unwrap().unwrap();
    assert!(discarded.is_none());

    let current = scheduler.cached(Collection::Campaigns).unwrap();
    assert_eq!(current.seq, 2);
    assert_eq!(campaign_ids(&current), vec!["1", "2"]);
    assert_eq!(current.origin, DataOrigin::Remote);
}

#[tokio::test]
async fn stop_ignores_in_flight_result() {
    let source = Arc::new(GatedSource::default());
    let gate = source.push(dataset::campaigns());
    let scheduler = live_scheduler(source.clone());
    let updates = scheduler.subscribe(Collection::Campaigns);

    let s = scheduler.clone();
    let pending = tokio::spawn(async move { s.refresh(Collection::Campaigns).await });
    wait_for_calls(&source, 1).await;
    assert_eq!(scheduler.in_flight(Collection::Campaigns), 1);

    scheduler.stop(Collection::Campaigns);
    gate.send(()).unwrap();

    assert!(pending.await.unwrap().unwrap().is_none());
    assert!(scheduler.cached(Collection::Campaigns).is_none());
    assert_eq!(scheduler.in_flight(Collection::Campaigns), 0);
    assert!(updates.recv_async().await.is_err(), "subscribers are disconnected");
}

#[tokio::test]
async fn cancelled_refresh_releases_its_slot() {
    let source = Arc::new(GatedSource::default());
    let _held = source.push(dataset::campaigns());
    let gate = source.push(dataset::campaigns()[..3].to_vec());
    let scheduler = live_scheduler(source.clone());
    let updates = scheduler.subscribe(Collection::Campaigns);

    let timed_out = tokio::time::timeout(
        Duration::from_millis(20),
        scheduler.refresh(Collection::Campaigns),
    )
    .await;
    assert!(timed_out.is_err());
    assert_eq!(source.calls(), 1);
    assert_eq!(scheduler.in_flight(Collection::Campaigns), 0);

    // The missing value still gets a background refresh.
    assert!(scheduler.get_current(Collection::Campaigns).is_none());
    wait_for_calls(&source, 2).await;
    gate.send(()).unwrap();

    let snapshot = next_snapshot(&updates).await;
    assert_eq!(snapshot.seq, 2);
    assert_eq!(campaign_ids(&snapshot), vec!["1", "2", "3"]);
    assert_eq!(scheduler.in_flight(Collection::Campaigns), 0);
}

// ===========================================================================
// Reads
// ===========================================================================

#[tokio::test]
async fn get_current_returns_immediately_and_refreshes_in_background() {
    let source = Arc::new(GatedSource::default());
    let gate = source.push(dataset::campaigns());
    let scheduler = live_scheduler(source.clone());
    let updates = scheduler.subscribe(Collection::Campaigns);

    assert!(scheduler.get_current(Collection::Campaigns).is_none());
    wait_for_calls(&source, 1).await;

    // A second read while the first refresh is pending does not issue another.
    assert!(scheduler.get_current(Collection::Campaigns).is_none());
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(source.calls(), 1);

    gate.send(()).unwrap();
    let snapshot = next_snapshot(&updates).await;
    assert_eq!(snapshot.seq, 1);

    let current = scheduler.get_current(Collection::Campaigns).unwrap();
    assert_eq!(campaign_ids(&current).len(), 12);
}

#[tokio::test]
async fn invalidate_forces_refetch_on_next_read() {
    let scheduler = mock_scheduler(SyntheticDataSource::new());
    let updates = scheduler.subscribe(Collection::Revenue);

    scheduler.refresh(Collection::Revenue).await.unwrap();
    assert_eq!(next_snapshot(&updates).await.seq, 1);

    // Fresh: reading does not refetch.
    assert!(scheduler.get_current(Collection::Revenue).is_some());
    assert_eq!(scheduler.in_flight(Collection::Revenue), 0);

    scheduler.invalidate(Collection::Revenue);
    let stale = scheduler.get_current(Collection::Revenue).unwrap();
    assert_eq!(stale.seq, 1, "stale value is still served");
    assert_eq!(next_snapshot(&updates).await.seq, 2);
}

#[tokio::test]
async fn failed_refresh_keeps_cached_value() {
    let synthetic = SyntheticDataSource::new().with_faults(FaultInjection::every(2));
    let scheduler = mock_scheduler(synthetic);

    let first = scheduler.refresh(Collection::Channels).await.unwrap().unwrap();
    assert!(scheduler.refresh(Collection::Channels).await.is_err());

    let cached = scheduler.cached(Collection::Channels).unwrap();
    assert_eq!(cached.seq, first.seq);
    assert!(scheduler
        .last_error(Collection::Channels)
        .unwrap()
        .contains("injected fault"));

    scheduler.refresh(Collection::Channels).await.unwrap();
    assert!(scheduler.last_error(Collection::Channels).is_none());
}

// ===========================================================================
// Notifications and polling
// ===========================================================================

#[tokio::test]
async fn on_update_invokes_callback() {
    let scheduler = mock_scheduler(SyntheticDataSource::new());
    let (tx, rx) = flume::unbounded();
    let task = scheduler.on_update(Collection::Metrics, move |snapshot| {
        let _ = tx.send(snapshot.seq);
    });

    scheduler.refresh(Collection::Metrics).await.unwrap();
    scheduler.refresh(Collection::Metrics).await.unwrap();

    let timeout = Duration::from_secs(5);
    assert_eq!(tokio::time::timeout(timeout, rx.recv_async()).await.unwrap().unwrap(), 1);
    assert_eq!(tokio::time::timeout(timeout, rx.recv_async()).await.unwrap().unwrap(), 2);

    scheduler.stop(Collection::Metrics);
    tokio::time::timeout(timeout, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn polling_refreshes_on_interval_until_stopped() {
    let scheduler = mock_scheduler(SyntheticDataSource::new()).with_policy(
        Collection::Metrics,
        RefreshPolicy::every(Duration::from_millis(20)),
    );
    let updates = scheduler.subscribe(Collection::Metrics);

    scheduler.start(Collection::Metrics);
    assert!(scheduler.is_running(Collection::Metrics));
    let a = next_snapshot(&updates).await;
    let b = next_snapshot(&updates).await;
    assert!(b.seq > a.seq);
    assert_eq!(a.origin, DataOrigin::Synthetic);

    scheduler.stop(Collection::Metrics);
    assert!(!scheduler.is_running(Collection::Metrics));
    assert!(updates.recv_async().await.is_err());
}

#[tokio::test]
async fn mock_status_is_fetched_once() {
    let scheduler = mock_scheduler(SyntheticDataSource::new());
    let updates = scheduler.subscribe(Collection::MockStatus);

    scheduler.start(Collection::MockStatus);
    let snapshot = next_snapshot(&updates).await;
    assert_eq!(*snapshot.data, CollectionData::MockStatus(true));

    // Never stale: reading does not refetch.
    assert!(scheduler.get_current(Collection::MockStatus).is_some());
    assert_eq!(scheduler.in_flight(Collection::MockStatus), 0);
    assert!(tokio::time::timeout(Duration::from_millis(50), updates.recv_async())
        .await
        .is_err());
}

#[tokio::test]
async fn shutdown_stops_every_collection() {
    let scheduler = mock_scheduler(SyntheticDataSource::new());
    scheduler.start_all();
    for collection in Collection::ALL {
        scheduler.stop(collection);
    }
    scheduler.start_all();
    scheduler.shutdown();
    for collection in Collection::ALL {
        assert!(!scheduler.is_running(collection));
    }
}

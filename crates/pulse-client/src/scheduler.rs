//! Per-collection cache with background refresh.
//!
//! Every collection has a [`RefreshPolicy`]: how long a value stays fresh,
//! how often it is polled, and how the remote path is retried. Results are
//! applied in issue order: each refresh takes a sequence number up front and
//! a result whose number precedes the applied one is dropped. Stopping a
//! collection bumps its generation so anything still in flight is ignored
//! when it lands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use pulse_api_types::Collection;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;
use crate::retry::RetryPolicy;
use crate::service::ResilientDataService;
use crate::source::{CollectionData, DataOrigin};

// ---------------------------------------------------------------------------
// RefreshPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// How long a fetched value counts as fresh. `None` means forever.
    pub stale_time: Option<Duration>,
    /// Background poll period. `None` fetches once.
    pub refetch_interval: Option<Duration>,
    pub retry: RetryPolicy,
}

impl RefreshPolicy {
    /// Fresh for, and polled every, `period`.
    pub fn every(period: Duration) -> Self {
        Self {
            stale_time: Some(period),
            refetch_interval: Some(period),
            retry: RetryPolicy::default(),
        }
    }

    /// Fetched once, never stale.
    pub fn once() -> Self {
        Self {
            stale_time: None,
            refetch_interval: None,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Faster-moving collections poll more often.
    pub fn for_collection(collection: Collection) -> Self {
        let minutes = |m: u64| Self::every(Duration::from_secs(m * 60));
        match collection {
            Collection::Revenue | Collection::Channels => minutes(5),
            Collection::Audience => minutes(10),
            Collection::Campaigns | Collection::Dashboard => minutes(2),
            Collection::Metrics => minutes(1),
            Collection::MockStatus => Self::once(),
        }
    }

    pub fn is_stale(&self, fetched_at: Instant, now: Instant) -> bool {
        match self.stale_time {
            Some(ttl) => now.saturating_duration_since(fetched_at) >= ttl,
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// An applied cache value.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub collection: Collection,
    pub data: Arc<CollectionData>,
    pub origin: DataOrigin,
    /// Sequence number of the refresh that produced this value.
    pub seq: u64,
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Per-collection state
// ---------------------------------------------------------------------------

struct Entry {
    policy: RefreshPolicy,
    current: Option<Snapshot>,
    /// `None` after invalidation or before the first fetch.
    fresh_since: Option<Instant>,
    next_seq: u64,
    applied_seq: u64,
    in_flight: usize,
    generation: u64,
    last_error: Option<String>,
    subscribers: Vec<flume::Sender<Snapshot>>,
    task: Option<JoinHandle<()>>,
}

impl Entry {
    fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            current: None,
            fresh_since: None,
            next_seq: 0,
            applied_seq: 0,
            in_flight: 0,
            generation: 0,
            last_error: None,
            subscribers: Vec::new(),
            task: None,
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        match self.fresh_since {
            Some(at) => self.policy.is_stale(at, now),
            None => true,
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn teardown(&mut self) {
        self.generation += 1;
        self.in_flight = 0;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.subscribers.clear();
    }
}

struct Inner {
    service: Arc<ResilientDataService>,
    entries: Mutex<HashMap<Collection, Entry>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(entries) = self.entries.get_mut() {
            for entry in entries.values_mut() {
                entry.teardown();
            }
        }
    }
}

/// Releases an `in_flight` slot when a refresh future is dropped before it
/// lands. Slots taken before a stop are already cleared by `teardown`.
struct InFlightGuard<'a> {
    scheduler: &'a RefreshScheduler,
    collection: Collection,
    generation: u64,
    armed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let (collection, generation) = (self.collection, self.generation);
        debug!(%collection, "refresh cancelled before completion");
        self.scheduler.with_entry(collection, |e| {
            if e.generation == generation {
                e.in_flight = e.in_flight.saturating_sub(1);
            }
        });
    }
}

// ---------------------------------------------------------------------------
// RefreshScheduler
// ---------------------------------------------------------------------------

/// Cache and poller for every [`Collection`].
///
/// Cheap to clone; clones share the same cache. Polling tasks hold only a
/// weak reference, so dropping the last handle stops them.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl RefreshScheduler {
    pub fn new(service: Arc<ResilientDataService>) -> Self {
        let entries = Collection::ALL
            .into_iter()
            .map(|c| (c, Entry::new(RefreshPolicy::for_collection(c))))
            .collect();
        Self {
            inner: Arc::new(Inner {
                service,
                entries: Mutex::new(entries),
            }),
        }
    }

    /// Replace the policy for one collection. Takes effect on the next
    /// refresh or poll cycle.
    pub fn with_policy(self, collection: Collection, policy: RefreshPolicy) -> Self {
        self.set_policy(collection, policy);
        self
    }

    pub fn set_policy(&self, collection: Collection, policy: RefreshPolicy) {
        self.with_entry(collection, |e| e.policy = policy);
    }

    pub fn policy(&self, collection: Collection) -> RefreshPolicy {
        self.with_entry(collection, |e| e.policy.clone())
    }

    pub fn service(&self) -> &Arc<ResilientDataService> {
        &self.inner.service
    }

    fn with_entry<R>(&self, collection: Collection, f: impl FnOnce(&mut Entry) -> R) -> R {
        let mut entries = self.inner.entries.lock().expect("scheduler lock poisoned");
        let entry = entries
            .entry(collection)
            .or_insert_with(|| Entry::new(RefreshPolicy::for_collection(collection)));
        f(entry)
    }

    // -- reads -------------------------------------------------------------

    /// The cached value, without waiting. A missing or stale value kicks
    /// off a background refresh unless one is already in flight.
    pub fn get_current(&self, collection: Collection) -> Option<Snapshot> {
        let (current, needs_refresh) = self.with_entry(collection, |e| {
            let needs = e.in_flight == 0 && e.is_stale(Instant::now());
            (e.current.clone(), needs)
        });
        if needs_refresh {
            self.spawn_refresh(collection);
        }
        current
    }

    /// The cached value, never triggering a refresh.
    pub fn cached(&self, collection: Collection) -> Option<Snapshot> {
        self.with_entry(collection, |e| e.current.clone())
    }

    pub fn last_error(&self, collection: Collection) -> Option<String> {
        self.with_entry(collection, |e| e.last_error.clone())
    }

    pub fn is_running(&self, collection: Collection) -> bool {
        self.with_entry(collection, |e| e.is_running())
    }

    pub fn in_flight(&self, collection: Collection) -> usize {
        self.with_entry(collection, |e| e.in_flight)
    }

    // -- subscriptions -----------------------------------------------------

    /// Receive every snapshot applied from now on. The channel disconnects
    /// when the collection is stopped.
    pub fn subscribe(&self, collection: Collection) -> flume::Receiver<Snapshot> {
        let (tx, rx) = flume::unbounded();
        self.with_entry(collection, |e| e.subscribers.push(tx));
        rx
    }

    /// Forward applied snapshots to `callback` on a background task. The
    /// task ends when the collection is stopped.
    pub fn on_update<F>(&self, collection: Collection, callback: F) -> JoinHandle<()>
    where
        F: Fn(Snapshot) + Send + 'static,
    {
        let rx = self.subscribe(collection);
        tokio::spawn(async move {
            while let Ok(snapshot) = rx.recv_async().await {
                callback(snapshot);
            }
        })
    }

    // -- refresh -----------------------------------------------------------

    /// Mark the cached value stale; the next read or poll refetches it.
    pub fn invalidate(&self, collection: Collection) {
        debug!(%collection, "invalidated");
        self.with_entry(collection, |e| e.fresh_since = None);
    }

    /// Fetch once and apply the result.
    ///
    /// Returns `Ok(None)` when the result was discarded, either because a
    /// later-issued refresh has already been applied or because the
    /// collection was stopped while this one was in flight.
    pub async fn refresh(&self, collection: Collection) -> Result<Option<Snapshot>, ServiceError> {
        let (seq, generation, retry) = self.with_entry(collection, |e| {
            e.next_seq += 1;
            e.in_flight += 1;
            (e.next_seq, e.generation, e.policy.retry.clone())
        });
        let mut guard = InFlightGuard {
            scheduler: self,
            collection,
            generation,
            armed: true,
        };

        let result = self.inner.service.fetch(collection, &retry).await;

        guard.armed = false;
        self.with_entry(collection, |e| {
            if e.generation != generation {
                debug!(%collection, seq, "discarding result for stopped collection");
                return Ok(None);
            }
            e.in_flight = e.in_flight.saturating_sub(1);
            if seq < e.applied_seq {
                debug!(%collection, seq, applied = e.applied_seq, "discarding out-of-order result");
                return Ok(None);
            }

            match result {
                Ok(sourced) => {
                    let snapshot = Snapshot {
                        collection,
                        data: Arc::new(sourced.data),
                        origin: sourced.origin,
                        seq,
                        fetched_at: Utc::now(),
                    };
                    e.applied_seq = seq;
                    e.current = Some(snapshot.clone());
                    e.fresh_since = Some(Instant::now());
                    e.last_error = None;
                    e.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
                    debug!(%collection, seq, origin = %snapshot.origin, "snapshot applied");
                    Ok(Some(snapshot))
                }
                Err(err) => {
                    error!(%collection, seq, error = %err, "refresh failed, keeping cached value");
                    e.last_error = Some(err.to_string());
                    Err(err)
                }
            }
        })
    }

    fn spawn_refresh(&self, collection: Collection) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(%collection, "no tokio runtime, skipping background refresh");
            return;
        };
        let scheduler = self.clone();
        handle.spawn(async move {
            // Failures are recorded in `last_error`.
            let _ = scheduler.refresh(collection).await;
        });
    }

    // -- polling -----------------------------------------------------------

    /// Start background polling for `collection`. No-op if already running.
    pub fn start(&self, collection: Collection) {
        let weak = Arc::downgrade(&self.inner);
        self.with_entry(collection, |e| {
            if e.is_running() {
                return;
            }
            let interval = e.policy.refetch_interval;
            info!(%collection, interval_secs = interval.map(|d| d.as_secs()), "polling started");
            e.task = Some(tokio::spawn(poll_loop(weak, collection)));
        });
    }

    pub fn start_all(&self) {
        for collection in Collection::ALL {
            self.start(collection);
        }
    }

    /// Stop polling `collection`, ignore any in-flight result, and
    /// disconnect its subscribers. The cached value is kept.
    pub fn stop(&self, collection: Collection) {
        self.with_entry(collection, |e| {
            if e.is_running() {
                info!(%collection, "polling stopped");
            }
            e.teardown();
        });
    }

    pub fn shutdown(&self) {
        for collection in Collection::ALL {
            self.stop(collection);
        }
    }
}

async fn poll_loop(inner: Weak<Inner>, collection: Collection) {
    loop {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let scheduler = RefreshScheduler { inner };
        let _ = scheduler.refresh(collection).await;
        let interval = scheduler.policy(collection).refetch_interval;
        drop(scheduler);

        match interval {
            Some(period) => tokio::time::sleep(period).await,
            None => break,
        }
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("service", &self.inner.service)
            .finish_non_exhaustive()
    }
}

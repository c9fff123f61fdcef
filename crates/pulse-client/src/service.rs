use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use pulse_api_types::{
    AudienceSegment, Campaign, ChannelPerformance, Collection, DashboardBundle, MetricsBundle,
    RevenuePoint,
};
use pulse_core::config::{Config, FetchMode};
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, ServiceError};
use crate::remote::RemoteDataSource;
use crate::retry::RetryPolicy;
use crate::source::{CollectionData, DataOrigin, DataSource, Fetchable, Sourced};
use crate::synthetic::SyntheticDataSource;

// ---------------------------------------------------------------------------
// ModeSwitch
// ---------------------------------------------------------------------------

/// Shared mock/live flag. Cloning yields a handle to the same flag, so a
/// toggle is seen by every service holding it from the next fetch on.
#[derive(Debug, Clone)]
pub struct ModeSwitch {
    mock: Arc<AtomicBool>,
}

impl ModeSwitch {
    pub fn new(mode: FetchMode) -> Self {
        Self {
            mock: Arc::new(AtomicBool::new(mode.is_mock())),
        }
    }

    pub fn get(&self) -> FetchMode {
        if self.is_mock() {
            FetchMode::Mock
        } else {
            FetchMode::Live
        }
    }

    pub fn set(&self, mode: FetchMode) {
        self.mock.store(mode.is_mock(), Ordering::SeqCst);
    }

    pub fn is_mock(&self) -> bool {
        self.mock.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// FallbackNotice
// ---------------------------------------------------------------------------

/// Published whenever a remote failure is masked with synthetic data.
#[derive(Debug, Clone)]
pub struct FallbackNotice {
    pub collection: Collection,
    pub error: FetchError,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ResilientDataService
// ---------------------------------------------------------------------------

/// Mode-aware data access that never surfaces remote failures.
///
/// In mock mode every call goes straight to the synthetic source. In live
/// mode the remote is tried first (with retries); if it still fails the
/// error is logged, a [`FallbackNotice`] is published, and the synthetic
/// value is returned tagged [`DataOrigin::Fallback`].
pub struct ResilientDataService {
    remote: Arc<dyn DataSource>,
    synthetic: Arc<dyn DataSource>,
    mode: ModeSwitch,
    retry: RetryPolicy,
    last_origin: Mutex<Option<DataOrigin>>,
    fallback_count: AtomicU64,
    fallback_subscribers: Mutex<Vec<flume::Sender<FallbackNotice>>>,
}

impl ResilientDataService {
    pub fn new(remote: Arc<dyn DataSource>, synthetic: Arc<dyn DataSource>, mode: ModeSwitch) -> Self {
        Self {
            remote,
            synthetic,
            mode,
            retry: RetryPolicy::default(),
            last_origin: Mutex::new(None),
            fallback_count: AtomicU64::new(0),
            fallback_subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Build the HTTP client and synthetic source described by `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self, FetchError> {
        let remote = RemoteDataSource::from_config(&cfg.api)?;
        let synthetic = SyntheticDataSource::from_config(&cfg.synthetic);
        Ok(Self::new(
            Arc::new(remote),
            Arc::new(synthetic),
            ModeSwitch::new(cfg.fetch_mode()),
        )
        .with_retry(RetryPolicy::from_config(&cfg.api)))
    }

    /// Policy used by the typed `fetch_*` methods.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // -- mode --------------------------------------------------------------

    pub fn mode(&self) -> ModeSwitch {
        self.mode.clone()
    }

    pub fn is_mock(&self) -> bool {
        self.mode.is_mock()
    }

    pub fn set_mode(&self, mode: FetchMode) {
        info!(%mode, "data mode changed");
        self.mode.set(mode);
    }

    // -- fallback signal ---------------------------------------------------

    /// Origin of the most recently completed fetch.
    pub fn last_origin(&self) -> Option<DataOrigin> {
        *self.last_origin.lock().expect("origin lock poisoned")
    }

    /// Whether the most recently completed fetch was served by fallback.
    pub fn fallback_active(&self) -> bool {
        self.last_origin() == Some(DataOrigin::Fallback)
    }

    pub fn fallback_count(&self) -> u64 {
        self.fallback_count.load(Ordering::Relaxed)
    }

    pub fn subscribe_fallbacks(&self) -> flume::Receiver<FallbackNotice> {
        let (tx, rx) = flume::unbounded();
        self.fallback_subscribers
            .lock()
            .expect("fallback subscribers lock poisoned")
            .push(tx);
        rx
    }

    fn record_origin(&self, origin: DataOrigin) {
        *self.last_origin.lock().expect("origin lock poisoned") = Some(origin);
    }

    fn publish_fallback(&self, collection: Collection, error: FetchError) {
        self.fallback_count.fetch_add(1, Ordering::Relaxed);
        let notice = FallbackNotice {
            collection,
            error,
            at: Utc::now(),
        };
        let mut senders = self
            .fallback_subscribers
            .lock()
            .expect("fallback subscribers lock poisoned");
        senders.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    // -- typed fetches -----------------------------------------------------

    pub async fn fetch_revenue(&self) -> Result<Vec<RevenuePoint>, ServiceError> {
        self.resolve(&self.retry).await.map(|s| s.data)
    }

    pub async fn fetch_channels(&self) -> Result<Vec<ChannelPerformance>, ServiceError> {
        self.resolve(&self.retry).await.map(|s| s.data)
    }

    pub async fn fetch_audience(&self) -> Result<Vec<AudienceSegment>, ServiceError> {
        self.resolve(&self.retry).await.map(|s| s.data)
    }

    pub async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, ServiceError> {
        self.resolve(&self.retry).await.map(|s| s.data)
    }

    pub async fn fetch_metrics(&self) -> Result<MetricsBundle, ServiceError> {
        self.resolve(&self.retry).await.map(|s| s.data)
    }

    /// All five collections, fetched concurrently. Each part falls back on
    /// its own; the call returns once every part has settled.
    pub async fn fetch_all(&self) -> Result<DashboardBundle, ServiceError> {
        self.fetch_all_sourced(&self.retry).await.map(|s| s.data)
    }

    /// Whether the service is currently in mock mode. Never touches a
    /// data source.
    pub fn fetch_mock_status(&self) -> bool {
        self.is_mock()
    }

    /// Untyped fetch used by the refresh scheduler.
    pub async fn fetch(
        &self,
        collection: Collection,
        retry: &RetryPolicy,
    ) -> Result<Sourced<CollectionData>, ServiceError> {
        match collection {
            Collection::Revenue => self.fetch_data::<Vec<RevenuePoint>>(retry).await,
            Collection::Channels => self.fetch_data::<Vec<ChannelPerformance>>(retry).await,
            Collection::Audience => self.fetch_data::<Vec<AudienceSegment>>(retry).await,
            Collection::Campaigns => self.fetch_data::<Vec<Campaign>>(retry).await,
            Collection::Metrics => self.fetch_data::<MetricsBundle>(retry).await,
            Collection::Dashboard => Ok(self
                .fetch_all_sourced(retry)
                .await?
                .map(|bundle| CollectionData::Dashboard(Box::new(bundle)))),
            Collection::MockStatus => {
                let mock = self.fetch_mock_status();
                let origin = if mock {
                    DataOrigin::Synthetic
                } else {
                    DataOrigin::Remote
                };
                Ok(Sourced::new(CollectionData::MockStatus(mock), origin))
            }
        }
    }

    async fn fetch_data<T: Fetchable>(
        &self,
        retry: &RetryPolicy,
    ) -> Result<Sourced<CollectionData>, ServiceError> {
        Ok(self.resolve::<T>(retry).await?.map(T::into_data))
    }

    /// [`fetch_all`](Self::fetch_all) with an explicit retry policy and
    /// the combined origin of the five parts.
    pub async fn fetch_all_sourced(
        &self,
        retry: &RetryPolicy,
    ) -> Result<Sourced<DashboardBundle>, ServiceError> {
        let (revenue, channels, audience, campaigns, metrics) = tokio::join!(
            self.resolve::<Vec<RevenuePoint>>(retry),
            self.resolve::<Vec<ChannelPerformance>>(retry),
            self.resolve::<Vec<AudienceSegment>>(retry),
            self.resolve::<Vec<Campaign>>(retry),
            self.resolve::<MetricsBundle>(retry),
        );
        let (revenue, channels, audience, campaigns, metrics) =
            (revenue?, channels?, audience?, campaigns?, metrics?);

        let origin = revenue
            .origin
            .combine(channels.origin)
            .combine(audience.origin)
            .combine(campaigns.origin)
            .combine(metrics.origin);

        Ok(Sourced::new(
            DashboardBundle {
                revenue: revenue.data,
                channels: channels.data,
                audience: audience.data,
                campaigns: campaigns.data,
                metrics: metrics.data,
            },
            origin,
        ))
    }

    // -- resolution --------------------------------------------------------

    async fn resolve<T: Fetchable>(&self, retry: &RetryPolicy) -> Result<Sourced<T>, ServiceError> {
        let collection = T::COLLECTION;

        if self.mode.is_mock() {
            let data = self.synthetic_value::<T>().await?;
            self.record_origin(DataOrigin::Synthetic);
            return Ok(Sourced::new(data, DataOrigin::Synthetic));
        }

        let remote = self.remote.as_ref();
        match retry.run(collection.as_str(), || T::load(remote)).await {
            Ok(data) => {
                debug!(%collection, source = remote.name(), "remote fetch succeeded");
                self.record_origin(DataOrigin::Remote);
                Ok(Sourced::new(data, DataOrigin::Remote))
            }
            Err(err) => {
                warn!(
                    %collection,
                    source = remote.name(),
                    error = %err,
                    "remote fetch failed, falling back to synthetic data"
                );
                let data = self.synthetic_value::<T>().await?;
                self.publish_fallback(collection, err);
                self.record_origin(DataOrigin::Fallback);
                Ok(Sourced::new(data, DataOrigin::Fallback))
            }
        }
    }

    async fn synthetic_value<T: Fetchable>(&self) -> Result<T, ServiceError> {
        let collection = T::COLLECTION;
        T::load(self.synthetic.as_ref()).await.map_err(|source| {
            error!(%collection, error = %source, "synthetic source failed");
            ServiceError::SyntheticUnavailable { collection, source }
        })
    }
}

impl std::fmt::Debug for ResilientDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientDataService")
            .field("remote", &self.remote.name())
            .field("synthetic", &self.synthetic.name())
            .field("mode", &self.mode.get())
            .field("retry", &self.retry)
            .field("fallback_count", &self.fallback_count())
            .finish()
    }
}

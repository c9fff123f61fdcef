use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use pulse_api_types::{
    AudienceSegment, Campaign, ChannelPerformance, Collection, DashboardBundle, MetricsBundle,
    RevenuePoint,
};
use serde::Serialize;

use crate::error::FetchError;

/// Boxed future returned by [`DataSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// DataSource trait
// ---------------------------------------------------------------------------

/// Something that can produce the five dashboard collections.
///
/// Implemented by the HTTP client and the synthetic generator; tests plug in
/// their own doubles.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    async fn revenue(&self) -> Result<Vec<RevenuePoint>, FetchError>;

    async fn channels(&self) -> Result<Vec<ChannelPerformance>, FetchError>;

    async fn audience(&self) -> Result<Vec<AudienceSegment>, FetchError>;

    async fn campaigns(&self) -> Result<Vec<Campaign>, FetchError>;

    async fn metrics(&self) -> Result<MetricsBundle, FetchError>;
}

// ---------------------------------------------------------------------------
// Fetchable
// ---------------------------------------------------------------------------

/// Ties a collection payload type to the source method that loads it.
pub trait Fetchable: Sized + Send + 'static {
    const COLLECTION: Collection;

    fn load(source: &dyn DataSource) -> SourceFuture<'_, Self>;

    fn into_data(self) -> CollectionData;
}

impl Fetchable for Vec<RevenuePoint> {
    const COLLECTION: Collection = Collection::Revenue;

    fn load(source: &dyn DataSource) -> SourceFuture<'_, Self> {
        source.revenue()
    }

    fn into_data(self) -> CollectionData {
        CollectionData::Revenue(self)
    }
}

impl Fetchable for Vec<ChannelPerformance> {
    const COLLECTION: Collection = Collection::Channels;

    fn load(source: &dyn DataSource) -> SourceFuture<'_, Self> {
        source.channels()
    }

    fn into_data(self) -> CollectionData {
        CollectionData::Channels(self)
    }
}

impl Fetchable for Vec<AudienceSegment> {
    const COLLECTION: Collection = Collection::Audience;

    fn load(source: &dyn DataSource) -> SourceFuture<'_, Self> {
        source.audience()
    }

    fn into_data(self) -> CollectionData {
        CollectionData::Audience(self)
    }
}

impl Fetchable for Vec<Campaign> {
    const COLLECTION: Collection = Collection::Campaigns;

    fn load(source: &dyn DataSource) -> SourceFuture<'_, Self> {
        source.campaigns()
    }

    fn into_data(self) -> CollectionData {
        CollectionData::Campaigns(self)
    }
}

impl Fetchable for MetricsBundle {
    const COLLECTION: Collection = Collection::Metrics;

    fn load(source: &dyn DataSource) -> SourceFuture<'_, Self> {
        source.metrics()
    }

    fn into_data(self) -> CollectionData {
        CollectionData::Metrics(self)
    }
}

// ---------------------------------------------------------------------------
// CollectionData
// ---------------------------------------------------------------------------

/// Payload of any cached collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionData {
    Revenue(Vec<RevenuePoint>),
    Channels(Vec<ChannelPerformance>),
    Audience(Vec<AudienceSegment>),
    Campaigns(Vec<Campaign>),
    Metrics(MetricsBundle),
    Dashboard(Box<DashboardBundle>),
    MockStatus(bool),
}

impl CollectionData {
    pub fn collection(&self) -> Collection {
        match self {
            CollectionData::Revenue(_) => Collection::Revenue,
            CollectionData::Channels(_) => Collection::Channels,
            CollectionData::Audience(_) => Collection::Audience,
            CollectionData::Campaigns(_) => Collection::Campaigns,
            CollectionData::Metrics(_) => Collection::Metrics,
            CollectionData::Dashboard(_) => Collection::Dashboard,
            CollectionData::MockStatus(_) => Collection::MockStatus,
        }
    }

    /// Campaign rows, whether fetched alone or as part of the bundle.
    pub fn campaigns(&self) -> Option<&[Campaign]> {
        match self {
            CollectionData::Campaigns(rows) => Some(rows),
            CollectionData::Dashboard(bundle) => Some(&bundle.campaigns),
            _ => None,
        }
    }

    /// Number of records, for log lines and status output.
    pub fn len(&self) -> usize {
        match self {
            CollectionData::Revenue(v) => v.len(),
            CollectionData::Channels(v) => v.len(),
            CollectionData::Audience(v) => v.len(),
            CollectionData::Campaigns(v) => v.len(),
            CollectionData::Metrics(_) | CollectionData::MockStatus(_) => 1,
            CollectionData::Dashboard(b) => {
                b.revenue.len() + b.channels.len() + b.audience.len() + b.campaigns.len() + 1
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Origin tagging
// ---------------------------------------------------------------------------

/// Where a value actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    /// The remote API answered successfully.
    Remote,
    /// Mock mode was on; the remote was never consulted.
    Synthetic,
    /// The remote failed and synthetic data was substituted.
    Fallback,
}

impl DataOrigin {
    /// Origin of a value assembled from several parts: any fallback taints
    /// the whole, then any synthetic part.
    pub fn combine(self, other: DataOrigin) -> DataOrigin {
        use DataOrigin::*;
        match (self, other) {
            (Fallback, _) | (_, Fallback) => Fallback,
            (Synthetic, _) | (_, Synthetic) => Synthetic,
            (Remote, Remote) => Remote,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, DataOrigin::Remote)
    }
}

impl std::fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataOrigin::Remote => f.write_str("remote"),
            DataOrigin::Synthetic => f.write_str("synthetic"),
            DataOrigin::Fallback => f.write_str("fallback"),
        }
    }
}

/// A value plus the origin it was served from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    pub data: T,
    pub origin: DataOrigin,
}

impl<T> Sourced<T> {
    pub fn new(data: T, origin: DataOrigin) -> Self {
        Self { data, origin }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        Sourced {
            data: f(self.data),
            origin: self.origin,
        }
    }
}

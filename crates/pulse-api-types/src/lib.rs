//! Shared analytics data model for pulse services.
//!
//! These types mirror the JSON served by the analytics API and are used by
//! the client, the table engine and the CLI so every layer agrees on the
//! wire format.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Chart series ──

/// One point of the monthly revenue series. Insertion order is chronological.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub name: String,
    pub value: f64,
}

/// Current-period metric for a channel alongside the prior period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPerformance {
    pub name: String,
    pub value: f64,
    pub comparison: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudienceSegment {
    pub name: String,
    pub value: f64,
    /// Opaque display token, passed through untouched.
    pub color: String,
}

// ── Campaigns ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 3] = [
        CampaignStatus::Active,
        CampaignStatus::Paused,
        CampaignStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
        }
    }

    /// Capitalised form used in tables and exports.
    pub fn label(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "Active",
            CampaignStatus::Paused => "Paused",
            CampaignStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(CampaignStatus::Active),
            "paused" => Ok(CampaignStatus::Paused),
            "completed" => Ok(CampaignStatus::Completed),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

/// A campaign row. `id` is the identity; every other field is replaced
/// wholesale on each fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub client: String,
    pub campaign: String,
    pub revenue: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub status: CampaignStatus,
}

// ── Metrics ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increase,
    Decrease,
}

/// Headline metric: a pre-formatted value plus an unsigned change whose
/// direction is carried by `change_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub value: String,
    pub change: f64,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBundle {
    pub total_revenue: MetricSummary,
    pub total_users: MetricSummary,
    pub conversions: MetricSummary,
    pub growth_rate: MetricSummary,
}

/// All five collections fetched together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardBundle {
    #[serde(rename = "revenueData")]
    pub revenue: Vec<RevenuePoint>,
    #[serde(rename = "channelPerformance")]
    pub channels: Vec<ChannelPerformance>,
    #[serde(rename = "audienceSegments")]
    pub audience: Vec<AudienceSegment>,
    #[serde(rename = "campaignData")]
    pub campaigns: Vec<Campaign>,
    #[serde(rename = "metricsData")]
    pub metrics: MetricsBundle,
}

// ── Collections ──

/// Cache keys for everything the dashboard polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    Revenue,
    Channels,
    Audience,
    Campaigns,
    Metrics,
    Dashboard,
    MockStatus,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Revenue,
        Collection::Channels,
        Collection::Audience,
        Collection::Campaigns,
        Collection::Metrics,
        Collection::Dashboard,
        Collection::MockStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Revenue => "revenue",
            Collection::Channels => "channels",
            Collection::Audience => "audience",
            Collection::Campaigns => "campaigns",
            Collection::Metrics => "metrics",
            Collection::Dashboard => "dashboard",
            Collection::MockStatus => "mock-status",
        }
    }

    /// API path relative to the configured base URL. `Dashboard` and
    /// `MockStatus` have no endpoint of their own.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            Collection::Revenue => Some("/analytics/revenue"),
            Collection::Channels => Some("/analytics/channels"),
            Collection::Audience => Some("/analytics/audience"),
            Collection::Campaigns => Some("/campaigns"),
            Collection::Metrics => Some("/analytics/metrics"),
            Collection::Dashboard | Collection::MockStatus => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

// ── Validation ──

/// Semantic checks serde cannot express: non-negative finite numbers and
/// unique campaign ids.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn non_negative(field: &str, owner: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{owner}: {field} must be a non-negative number, got {value}"))
    }
}

impl Validate for RevenuePoint {
    fn validate(&self) -> Result<(), String> {
        non_negative("value", &self.name, self.value)
    }
}

impl Validate for ChannelPerformance {
    fn validate(&self) -> Result<(), String> {
        non_negative("value", &self.name, self.value)?;
        non_negative("comparison", &self.name, self.comparison)
    }
}

impl Validate for AudienceSegment {
    fn validate(&self) -> Result<(), String> {
        non_negative("value", &self.name, self.value)
    }
}

impl Validate for Campaign {
    fn validate(&self) -> Result<(), String> {
        non_negative("revenue", &self.id, self.revenue)
    }
}

impl Validate for MetricSummary {
    fn validate(&self) -> Result<(), String> {
        non_negative("change", &self.value, self.change)
    }
}

impl Validate for MetricsBundle {
    fn validate(&self) -> Result<(), String> {
        self.total_revenue.validate()?;
        self.total_users.validate()?;
        self.conversions.validate()?;
        self.growth_rate.validate()
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        self.iter().try_for_each(Validate::validate)
    }
}

/// Campaign lists additionally require unique ids.
pub fn validate_campaigns(campaigns: &[Campaign]) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(campaigns.len());
    for c in campaigns {
        c.validate()?;
        if !seen.insert(c.id.as_str()) {
            return Err(format!("duplicate campaign id: {}", c.id));
        }
    }
    Ok(())
}

impl Validate for DashboardBundle {
    fn validate(&self) -> Result<(), String> {
        self.revenue.validate()?;
        self.channels.validate()?;
        self.audience.validate()?;
        validate_campaigns(&self.campaigns)?;
        self.metrics.validate()
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pulse_api_types::{
    AudienceSegment, Campaign, ChannelPerformance, MetricsBundle, RevenuePoint,
};
use pulse_core::config::SyntheticConfig;
use tracing::debug;

use crate::error::FetchError;
use crate::source::DataSource;

// ---------------------------------------------------------------------------
// FaultInjection
// ---------------------------------------------------------------------------

/// Deliberate failures for exercising the fallback path. Off by default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaultInjection {
    /// Probability in `[0, 1]` that any call fails.
    pub failure_rate: f64,
    /// Fail every n-th call. `0` disables.
    pub fail_every: u32,
}

impl FaultInjection {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn every(n: u32) -> Self {
        Self {
            fail_every: n,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.failure_rate > 0.0 || self.fail_every > 0
    }

    /// Decide whether call number `call` (1-based) fails.
    fn check(&self, call: u64) -> Result<(), FetchError> {
        if self.fail_every > 0 && call % u64::from(self.fail_every) == 0 {
            return Err(FetchError::FaultInjected(format!(
                "scheduled failure on call {call}"
            )));
        }
        if self.failure_rate > 0.0 && rand::random::<f64>() < self.failure_rate {
            return Err(FetchError::FaultInjected(format!(
                "random failure on call {call}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SyntheticDataSource
// ---------------------------------------------------------------------------

/// Serves the built-in reference dataset.
#[derive(Debug, Default)]
pub struct SyntheticDataSource {
    faults: FaultInjection,
    latency: Option<(Duration, Duration)>,
    calls: AtomicU64,
}

impl SyntheticDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &SyntheticConfig) -> Self {
        let latency = (cfg.latency_max_ms > 0).then(|| {
            let min = Duration::from_millis(cfg.latency_min_ms);
            (min, Duration::from_millis(cfg.latency_max_ms).max(min))
        });
        Self {
            faults: FaultInjection {
                failure_rate: cfg.failure_rate,
                fail_every: cfg.fail_every,
            },
            latency,
            calls: AtomicU64::new(0),
        }
    }

    pub fn with_faults(mut self, faults: FaultInjection) -> Self {
        self.faults = faults;
        self
    }

    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.latency = Some((min, max.max(min)));
        self
    }

    pub fn faults(&self) -> FaultInjection {
        self.faults
    }

    /// Calls served so far, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    async fn simulate(&self, what: &'static str) -> Result<(), FetchError> {
        if let Some((min, max)) = self.latency {
            let jitter = max.saturating_sub(min).mul_f64(rand::random::<f64>());
            tokio::time::sleep(min + jitter).await;
        }
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        self.faults.check(call).inspect_err(|e| {
            debug!(what, error = %e, "synthetic fault injected");
        })
    }
}

#[async_trait]
impl DataSource for SyntheticDataSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn revenue(&self) -> Result<Vec<RevenuePoint>, FetchError> {
        self.simulate("revenue").await?;
        Ok(dataset::revenue())
    }

    async fn channels(&self) -> Result<Vec<ChannelPerformance>, FetchError> {
        self.simulate("channels").await?;
        Ok(dataset::channels())
    }

    async fn audience(&self) -> Result<Vec<AudienceSegment>, FetchError> {
        self.simulate("audience").await?;
        Ok(dataset::audience())
    }

    async fn campaigns(&self) -> Result<Vec<Campaign>, FetchError> {
        self.simulate("campaigns").await?;
        Ok(dataset::campaigns())
    }

    async fn metrics(&self) -> Result<MetricsBundle, FetchError> {
        self.simulate("metrics").await?;
        Ok(dataset::metrics())
    }
}

// ---------------------------------------------------------------------------
// Reference dataset
// ---------------------------------------------------------------------------

/// The fixed dataset served in mock mode and on fallback.
pub mod dataset {
    use pulse_api_types::{
        AudienceSegment, Campaign, CampaignStatus, ChangeType, ChannelPerformance,
        DashboardBundle, MetricSummary, MetricsBundle, RevenuePoint,
    };

    const MONTHLY_REVENUE: [(&str, f64); 12] = [
        ("Jan", 45000.0),
        ("Feb", 52000.0),
        ("Mar", 48000.0),
        ("Apr", 61000.0),
        ("May", 58000.0),
        ("Jun", 67000.0),
        ("Jul", 72000.0),
        ("Aug", 69000.0),
        ("Sep", 78000.0),
        ("Oct", 82000.0),
        ("Nov", 85000.0),
        ("Dec", 91000.0),
    ];

    const CHANNELS: [(&str, f64, f64); 6] = [
        ("Google Ads", 35000.0, 31000.0),
        ("Facebook", 28000.0, 25000.0),
        ("Instagram", 22000.0, 19000.0),
        ("LinkedIn", 18000.0, 16000.0),
        ("Twitter", 12000.0, 14000.0),
        ("YouTube", 15000.0, 12000.0),
    ];

    const SEGMENTS: [(&str, f64); 5] = [
        ("Millennials", 32500.0),
        ("Gen Z", 28000.0),
        ("Gen X", 19500.0),
        ("Baby Boomers", 12000.0),
        ("Gen Alpha", 8000.0),
    ];

    // id, client, campaign, revenue, impressions, clicks, conversions, status
    type CampaignRow = (&'static str, &'static str, &'static str, f64, u64, u64, u64, CampaignStatus);

    const CAMPAIGNS: [CampaignRow; 12] = [
        ("1", "TechFlow Solutions", "Q4 Product Launch", 45600.0, 892_000, 24_500, 1_250, CampaignStatus::Active),
        ("2", "EcoLiving Co.", "Sustainable Products", 32400.0, 654_000, 18_200, 890, CampaignStatus::Active),
        ("3", "FinanceFirst", "Investment App Promo", 58900.0, 1_200_000, 31_000, 1_680, CampaignStatus::Active),
        ("4", "HealthMax", "Wellness Platform", 41200.0, 780_000, 22_100, 1_120, CampaignStatus::Paused),
        ("5", "EduLearn", "Online Courses", 28700.0, 560_000, 16_800, 740, CampaignStatus::Active),
        ("6", "StyleHub", "Fashion Collection", 37500.0, 920_000, 25_600, 980, CampaignStatus::Completed),
        ("7", "FoodieDelight", "Recipe App Launch", 22100.0, 440_000, 14_200, 520, CampaignStatus::Active),
        ("8", "TravelWise", "Vacation Packages", 51800.0, 1_100_000, 28_700, 1_320, CampaignStatus::Active),
        ("9", "FitLife", "Fitness Equipment", 39600.0, 820_000, 21_500, 890, CampaignStatus::Paused),
        ("10", "SmartHome", "IoT Devices", 47300.0, 950_000, 26_100, 1_150, CampaignStatus::Active),
        ("11", "ArtSpace", "Digital Art Platform", 19800.0, 380_000, 12_600, 420, CampaignStatus::Completed),
        ("12", "GreenEnergy", "Solar Solutions", 62400.0, 1_350_000, 34_200, 1_890, CampaignStatus::Active),
    ];

    pub fn revenue() -> Vec<RevenuePoint> {
        MONTHLY_REVENUE
            .iter()
            .map(|&(name, value)| RevenuePoint {
                name: name.to_string(),
                value,
            })
            .collect()
    }

    pub fn channels() -> Vec<ChannelPerformance> {
        CHANNELS
            .iter()
            .map(|&(name, value, comparison)| ChannelPerformance {
                name: name.to_string(),
                value,
                comparison,
            })
            .collect()
    }

    /// Segments carry theme palette references `hsl(var(--chart-1))` to
    /// `--chart-5` in order.
    pub fn audience() -> Vec<AudienceSegment> {
        SEGMENTS
            .iter()
            .enumerate()
            .map(|(i, &(name, value))| AudienceSegment {
                name: name.to_string(),
                value,
                color: format!("hsl(var(--chart-{}))", i + 1),
            })
            .collect()
    }

    pub fn campaigns() -> Vec<Campaign> {
        CAMPAIGNS
            .iter()
            .map(
                |&(id, client, campaign, revenue, impressions, clicks, conversions, status)| Campaign {
                    id: id.to_string(),
                    client: client.to_string(),
                    campaign: campaign.to_string(),
                    revenue,
                    impressions,
                    clicks,
                    conversions,
                    status,
                },
            )
            .collect()
    }

    fn increase(value: &str, change: f64) -> MetricSummary {
        MetricSummary {
            value: value.to_string(),
            change,
            change_type: ChangeType::Increase,
        }
    }

    pub fn metrics() -> MetricsBundle {
        MetricsBundle {
            total_revenue: increase("$847.2K", 12.5),
            total_users: increase("164.3K", 8.2),
            conversions: increase("12.4K", 15.8),
            growth_rate: increase("24.7%", 3.2),
        }
    }

    pub fn dashboard() -> DashboardBundle {
        DashboardBundle {
            revenue: revenue(),
            channels: channels(),
            audience: audience(),
            campaigns: campaigns(),
            metrics: metrics(),
        }
    }
}

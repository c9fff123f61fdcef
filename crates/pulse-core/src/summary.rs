//! Aggregates derived from fetched collections for headline cards and charts.

use pulse_api_types::{AudienceSegment, Campaign, CampaignStatus, ChangeType, ChannelPerformance};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignStats {
    pub total_campaigns: usize,
    pub active_campaigns: usize,
    pub paused_campaigns: usize,
    pub completed_campaigns: usize,
    pub total_revenue: f64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
}

impl CampaignStats {
    pub fn from_campaigns(campaigns: &[Campaign]) -> Self {
        campaigns.iter().fold(
            CampaignStats {
                total_campaigns: campaigns.len(),
                ..Default::default()
            },
            |mut acc, c| {
                match c.status {
                    CampaignStatus::Active => acc.active_campaigns += 1,
                    CampaignStatus::Paused => acc.paused_campaigns += 1,
                    CampaignStatus::Completed => acc.completed_campaigns += 1,
                }
                acc.total_revenue += c.revenue;
                acc.total_impressions += c.impressions;
                acc.total_clicks += c.clicks;
                acc.total_conversions += c.conversions;
                acc
            },
        )
    }
}

/// Campaigns with the given status, or all of them when `status` is `None`.
pub fn filter_by_status(campaigns: &[Campaign], status: Option<CampaignStatus>) -> Vec<&Campaign> {
    campaigns
        .iter()
        .filter(|c| status.is_none_or(|s| c.status == s))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudienceShare {
    pub name: String,
    pub value: f64,
    /// Percentage of the total, one decimal.
    pub percent: f64,
}

/// Each segment's share of the summed values. A zero total yields zero shares.
pub fn audience_shares(segments: &[AudienceSegment]) -> Vec<AudienceShare> {
    let total: f64 = segments.iter().map(|s| s.value).sum();
    segments
        .iter()
        .map(|s| AudienceShare {
            name: s.name.clone(),
            value: s.value,
            percent: if total > 0.0 {
                round1(s.value / total * 100.0)
            } else {
                0.0
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDelta {
    pub name: String,
    /// Unsigned percentage; the sign lives in `change_type`.
    pub change: f64,
    pub change_type: ChangeType,
}

/// Period-over-period change per channel. A zero comparison reports no change.
pub fn channel_deltas(channels: &[ChannelPerformance]) -> Vec<ChannelDelta> {
    channels
        .iter()
        .map(|c| {
            let pct = if c.comparison > 0.0 {
                (c.value - c.comparison) / c.comparison * 100.0
            } else {
                0.0
            };
            ChannelDelta {
                name: c.name.clone(),
                change: round1(pct.abs()),
                change_type: if pct < 0.0 {
                    ChangeType::Decrease
                } else {
                    ChangeType::Increase
                },
            }
        })
        .collect()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

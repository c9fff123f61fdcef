use std::fmt::Write as _;

use pulse_api_types::{ChangeType, DashboardBundle, MetricSummary};
use pulse_core::format::format_currency;
use pulse_core::summary::{audience_shares, channel_deltas, CampaignStats};

use super::{origin_note, AppContext};

/// Run the `status` subcommand: fetch every collection and print an overview.
pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let service = ctx.service()?;
    let sourced = service.fetch_all_sourced(service.retry_policy()).await?;

    if let Some(note) = origin_note(sourced.origin) {
        eprintln!("{note}");
    }
    print!("{}", render(&sourced.data, &ctx.config.fetch_mode().to_string()));
    Ok(())
}

fn signed(change: f64, change_type: ChangeType) -> String {
    match change_type {
        ChangeType::Increase => format!("+{change}%"),
        ChangeType::Decrease => format!("-{change}%"),
    }
}

fn metric_line(label: &str, m: &MetricSummary) -> String {
    format!("{label:<16}{:>10}  ({})\n", m.value, signed(m.change, m.change_type))
}

pub fn render(bundle: &DashboardBundle, mode: &str) -> String {
    let mut out = String::new();
    let stats = CampaignStats::from_campaigns(&bundle.campaigns);

    let _ = writeln!(out, "pulse dashboard  (mode: {mode})");
    let _ = writeln!(out, "{}", "-".repeat(40));
    out.push_str(&metric_line("Total revenue:", &bundle.metrics.total_revenue));
    out.push_str(&metric_line("Total users:", &bundle.metrics.total_users));
    out.push_str(&metric_line("Conversions:", &bundle.metrics.conversions));
    out.push_str(&metric_line("Growth rate:", &bundle.metrics.growth_rate));

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Campaigns:      {} ({} active, {} paused, {} completed)",
        stats.total_campaigns,
        stats.active_campaigns,
        stats.paused_campaigns,
        stats.completed_campaigns
    );
    let _ = writeln!(out, "  revenue:      {}", format_currency(stats.total_revenue));

    if let Some(latest) = bundle.revenue.last() {
        let _ = writeln!(
            out,
            "Latest month:   {} {}",
            latest.name,
            format_currency(latest.value)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Channels (vs previous period):");
    for delta in channel_deltas(&bundle.channels) {
        let _ = writeln!(
            out,
            "  {:<14}{:>8}",
            delta.name,
            signed(delta.change, delta.change_type)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Audience:");
    for share in audience_shares(&bundle.audience) {
        let _ = writeln!(out, "  {:<14}{:>6}%", &share.name, share.percent);
    }
    out
}

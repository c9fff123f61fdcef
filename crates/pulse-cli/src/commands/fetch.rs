use pulse_api_types::Collection;
use pulse_client::CollectionData;
use pulse_core::format::{format_compact, format_currency, format_number};

use super::{origin_note, AppContext};

pub async fn run(ctx: &AppContext, collection: Collection, json: bool) -> anyhow::Result<()> {
    let service = ctx.service()?;
    let sourced = service.fetch(collection, service.retry_policy()).await?;

    if let Some(note) = origin_note(sourced.origin) {
        eprintln!("{note}");
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&sourced.data)?);
    } else {
        for line in describe(&sourced.data) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Plain-text lines for one payload.
pub fn describe(data: &CollectionData) -> Vec<String> {
    match data {
        CollectionData::Revenue(points) => points
            .iter()
            .map(|p| format!("{:<4}{:>12}", p.name, format_currency(p.value)))
            .collect(),
        CollectionData::Channels(channels) => channels
            .iter()
            .map(|c| {
                format!(
                    "{:<14}{:>10}  (previous {})",
                    c.name,
                    format_number(c.value),
                    format_number(c.comparison)
                )
            })
            .collect(),
        CollectionData::Audience(segments) => segments
            .iter()
            .map(|s| format!("{:<14}{:>8}", s.name, format_compact(s.value)))
            .collect(),
        CollectionData::Campaigns(rows) => rows
            .iter()
            .map(|c| {
                format!(
                    "{:>3}  {:<20}{:<24}{:>10}  {}",
                    c.id,
                    c.client,
                    c.campaign,
                    format_currency(c.revenue),
                    c.status.label()
                )
            })
            .collect(),
        CollectionData::Metrics(m) => vec![
            format!("total revenue  {}", m.total_revenue.value),
            format!("total users    {}", m.total_users.value),
            format!("conversions    {}", m.conversions.value),
            format!("growth rate    {}", m.growth_rate.value),
        ],
        CollectionData::Dashboard(bundle) => vec![
            format!("revenue points  {}", bundle.revenue.len()),
            format!("channels        {}", bundle.channels.len()),
            format!("audience        {}", bundle.audience.len()),
            format!("campaigns       {}", bundle.campaigns.len()),
            format!("total revenue   {}", bundle.metrics.total_revenue.value),
        ],
        CollectionData::MockStatus(mock) => {
            vec![if *mock { "mock".to_string() } else { "live".to_string() }]
        }
    }
}

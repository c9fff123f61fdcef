use std::fmt::Write as _;

use pulse_core::format::{format_currency, group_thousands};
use pulse_core::table::TableView;

use super::{origin_note, AppContext, TableArgs};

/// Run the `campaigns` subcommand: one page of the filtered, sorted table.
pub async fn run(ctx: &AppContext, table: &TableArgs, page: usize, json: bool) -> anyhow::Result<()> {
    let service = ctx.service()?;
    let campaigns = service.fetch_campaigns().await?;
    if let Some(note) = service.last_origin().and_then(origin_note) {
        eprintln!("{note}");
    }

    let engine = table.engine(page);
    let view = engine.view(&campaigns);
    if json {
        println!("{}", serde_json::to_string_pretty(&view.rows)?);
    } else {
        print!("{}", render(&view));
    }
    Ok(())
}

pub fn render(view: &TableView<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<24} {:>10} {:>12} {:>8} {:>11}  {}",
        "Client", "Campaign", "Revenue", "Impressions", "Clicks", "Conversions", "Status"
    );
    for c in &view.rows {
        let _ = writeln!(
            out,
            "{:<20} {:<24} {:>10} {:>12} {:>8} {:>11}  {}",
            c.client,
            c.campaign,
            format_currency(c.revenue),
            group_thousands(c.impressions),
            group_thousands(c.clicks),
            group_thousands(c.conversions),
            c.status.label()
        );
    }

    match view.range() {
        Some((first, last)) => {
            let _ = writeln!(
                out,
                "\nShowing {first} to {last} of {} results (page {} of {})",
                view.filtered_count,
                view.page,
                view.total_pages.max(1)
            );
        }
        None => {
            let _ = writeln!(out, "\nNo campaigns found.");
        }
    }
    let _ = writeln!(out, "{} of {} campaigns", view.filtered_count, view.total_count);
    out
}

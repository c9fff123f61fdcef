use std::path::{Path, PathBuf};

use anyhow::Context;
use pulse_core::export::{write_csv, ExportError};

use super::{origin_note, AppContext, TableArgs};

/// Run the `export` subcommand: every filtered, sorted campaign (not just
/// one page) to `<slug>-<date>.csv`.
pub async fn run(
    ctx: &AppContext,
    table: &TableArgs,
    title: Option<&str>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let service = ctx.service()?;
    let campaigns = service.fetch_campaigns().await?;
    if let Some(note) = service.last_origin().and_then(origin_note) {
        eprintln!("{note}");
    }

    let rows = table.engine(1).to_export_rows(&campaigns);
    let title = title.unwrap_or(&ctx.config.export.table_title);
    let dir = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&ctx.config.export.output_dir));
    let today = chrono::Local::now().date_naive();

    let path = match write_csv(&dir, title, today, &rows) {
        Ok(path) => path,
        Err(ExportError::NoData) => anyhow::bail!("No campaigns match the current filters; nothing to export."),
        Err(e) => return Err(e).with_context(|| format!("writing CSV into {}", dir.display())),
    };
    println!("Exported {} campaigns to {}", rows.len(), path.display());
    Ok(())
}

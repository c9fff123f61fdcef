//! Typed export projection and CSV serialization.
//!
//! Each exportable entity projects itself into an [`ExportRow`]: an ordered
//! list of `(column, formatted value)` pairs. The CSV writer takes its header
//! from the first row.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pulse_api_types::{AudienceSegment, Campaign, ChannelPerformance, RevenuePoint};
use tracing::info;

use crate::format::{format_currency, format_number, group_thousands};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no data to export")]
    NoData,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// One flat export record with a fixed column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportRow {
    cells: Vec<(&'static str, String)>,
}

impl ExportRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.cells.push((column, value.into()));
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(c, _)| *c)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn cells(&self) -> &[(&'static str, String)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub trait Exportable {
    fn export_row(&self) -> ExportRow;
}

impl Exportable for Campaign {
    fn export_row(&self) -> ExportRow {
        ExportRow::new()
            .cell("Client", self.client.as_str())
            .cell("Campaign", self.campaign.as_str())
            .cell("Revenue", format_currency(self.revenue))
            .cell("Impressions", group_thousands(self.impressions))
            .cell("Clicks", group_thousands(self.clicks))
            .cell("Conversions", group_thousands(self.conversions))
            .cell("Status", self.status.label())
    }
}

impl Exportable for RevenuePoint {
    fn export_row(&self) -> ExportRow {
        ExportRow::new()
            .cell("Month", self.name.as_str())
            .cell("Revenue", format_currency(self.value))
    }
}

impl Exportable for ChannelPerformance {
    fn export_row(&self) -> ExportRow {
        ExportRow::new()
            .cell("Channel", self.name.as_str())
            .cell("Current", format_number(self.value))
            .cell("Previous", format_number(self.comparison))
    }
}

impl Exportable for AudienceSegment {
    fn export_row(&self) -> ExportRow {
        ExportRow::new()
            .cell("Segment", self.name.as_str())
            .cell("Value", format_number(self.value))
    }
}

pub fn export_rows<T: Exportable>(items: &[T]) -> Vec<ExportRow> {
    items.iter().map(Exportable::export_row).collect()
}

/// Render rows as CSV: an unquoted header line, then every field wrapped in
/// double quotes with embedded quotes doubled. Missing cells become `""`.
pub fn to_csv(rows: &[ExportRow]) -> Result<String, ExportError> {
    let first = rows.first().ok_or(ExportError::NoData)?;
    let headers: Vec<&'static str> = first.columns().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in rows {
        let fields: Vec<String> = headers
            .iter()
            .map(|h| format!("\"{}\"", row.get(h).unwrap_or("").replace('"', "\"\"")))
            .collect();
        lines.push(fields.join(","));
    }
    Ok(lines.join("\n"))
}

/// `<slug>-<YYYY-MM-DD>.csv`, where the slug lowercases the title and turns
/// each run of whitespace into a single `-`.
pub fn export_filename(title: &str, date: NaiveDate) -> String {
    let slug = title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("{slug}-{}.csv", date.format("%Y-%m-%d"))
}

/// Write `rows` as CSV into `dir` and return the path of the new file.
pub fn write_csv(
    dir: &Path,
    title: &str,
    date: NaiveDate,
    rows: &[ExportRow],
) -> Result<PathBuf, ExportError> {
    let body = to_csv(rows)?;
    let path = dir.join(export_filename(title, date));
    std::fs::write(&path, body)?;
    info!(path = %path.display(), rows = rows.len(), "csv export written");
    Ok(path)
}

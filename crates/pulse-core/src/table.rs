//! Campaign table engine: filter, sort, paginate and export over whatever
//! campaign snapshot is current.
//!
//! The engine owns only view state ([`TableState`]); records are passed in
//! on every call and never mutated, so the same state can be re-applied to
//! each new snapshot the scheduler delivers.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use pulse_api_types::{Campaign, CampaignStatus};
use serde::{Deserialize, Serialize};

use crate::export::{ExportRow, Exportable};

/// Rows per page.
pub const PAGE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Sort keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Id,
    Client,
    Campaign,
    Revenue,
    Impressions,
    Clicks,
    Conversions,
    Status,
}

impl SortField {
    pub const ALL: [SortField; 8] = [
        SortField::Id,
        SortField::Client,
        SortField::Campaign,
        SortField::Revenue,
        SortField::Impressions,
        SortField::Clicks,
        SortField::Conversions,
        SortField::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Client => "client",
            SortField::Campaign => "campaign",
            SortField::Revenue => "revenue",
            SortField::Impressions => "impressions",
            SortField::Clicks => "clicks",
            SortField::Conversions => "conversions",
            SortField::Status => "status",
        }
    }

    /// Ascending comparison of two campaigns on this field.
    pub fn compare(&self, a: &Campaign, b: &Campaign) -> Ordering {
        match self {
            SortField::Id => locale_cmp(&a.id, &b.id),
            SortField::Client => locale_cmp(&a.client, &b.client),
            SortField::Campaign => locale_cmp(&a.campaign, &b.campaign),
            SortField::Revenue => a.revenue.total_cmp(&b.revenue),
            SortField::Impressions => a.impressions.cmp(&b.impressions),
            SortField::Clicks => a.clicks.cmp(&b.clicks),
            SortField::Conversions => a.conversions.cmp(&b.conversions),
            SortField::Status => locale_cmp(a.status.as_str(), b.status.as_str()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortField::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| format!("unknown sort field: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Case-insensitive lexicographic order; on a case-only tie lowercase
/// sorts first.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    pub search_term: String,
    /// Empty means every status passes.
    pub status_filter: BTreeSet<CampaignStatus>,
    pub min_revenue: Option<f64>,
    pub min_conversions: Option<u64>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// 1-based.
    pub current_page: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            status_filter: BTreeSet::new(),
            min_revenue: None,
            min_conversions: None,
            sort_field: SortField::Revenue,
            sort_direction: SortDirection::Descending,
            current_page: 1,
        }
    }
}

/// One rendered page plus the counters shown around the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a> {
    pub rows: Vec<&'a Campaign>,
    pub filtered_count: usize,
    pub total_count: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl TableView<'_> {
    /// 1-based `(first, last)` positions of the visible rows within the
    /// filtered result, or `None` when the page is empty.
    pub fn range(&self) -> Option<(usize, usize)> {
        if self.rows.is_empty() {
            return None;
        }
        let first = (self.page - 1) * PAGE_SIZE + 1;
        Some((first, first + self.rows.len() - 1))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TableEngine {
    state: TableState,
}

impl TableEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: TableState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    // -- mutators -----------------------------------------------------------

    /// Same field flips the direction; a new field starts descending.
    pub fn set_sort(&mut self, field: SortField) {
        if field == self.state.sort_field {
            self.state.sort_direction = self.state.sort_direction.flip();
        } else {
            self.state.sort_field = field;
            self.state.sort_direction = SortDirection::Descending;
        }
    }

    pub fn toggle_status(&mut self, status: CampaignStatus) {
        if !self.state.status_filter.remove(&status) {
            self.state.status_filter.insert(status);
        }
        self.state.current_page = 1;
    }

    pub fn set_min_revenue(&mut self, value: Option<f64>) {
        self.state.min_revenue = value;
        self.state.current_page = 1;
    }

    pub fn set_min_conversions(&mut self, value: Option<u64>) {
        self.state.min_conversions = value;
        self.state.current_page = 1;
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.state.search_term = term.into();
        self.state.current_page = 1;
    }

    /// Drop status, revenue and conversion filters. The search term is left
    /// alone, matching the filter panel's "Clear filters" action.
    pub fn clear_filters(&mut self) {
        self.state.status_filter.clear();
        self.state.min_revenue = None;
        self.state.min_conversions = None;
        self.state.current_page = 1;
    }

    /// Jump to `page` unchecked; out-of-range pages render empty.
    pub fn set_page(&mut self, page: usize) {
        self.state.current_page = page;
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.state.current_page = self.state.current_page.saturating_add(1).min(total_pages.max(1));
    }

    pub fn previous_page(&mut self) {
        self.state.current_page = self.state.current_page.saturating_sub(1).max(1);
    }

    pub fn has_active_filters(&self) -> bool {
        !self.state.status_filter.is_empty()
            || self.state.min_revenue.is_some()
            || self.state.min_conversions.is_some()
    }

    // -- pipeline -----------------------------------------------------------

    pub fn matches(&self, c: &Campaign) -> bool {
        let s = &self.state;
        let term = s.search_term.to_lowercase();
        let matches_search = c.client.to_lowercase().contains(&term)
            || c.campaign.to_lowercase().contains(&term);
        let matches_status = s.status_filter.is_empty() || s.status_filter.contains(&c.status);
        let matches_revenue = s.min_revenue.is_none_or(|min| c.revenue >= min);
        let matches_conversions = s.min_conversions.is_none_or(|min| c.conversions >= min);
        matches_search && matches_status && matches_revenue && matches_conversions
    }

    pub fn filter<'a, I>(&self, records: I) -> Vec<&'a Campaign>
    where
        I: IntoIterator<Item = &'a Campaign>,
    {
        records.into_iter().filter(|c| self.matches(c)).collect()
    }

    /// Order by the current sort key. `sort_by` is stable, so equal keys
    /// keep their input order in both directions.
    pub fn sort<'a, I>(&self, records: I) -> Vec<&'a Campaign>
    where
        I: IntoIterator<Item = &'a Campaign>,
    {
        let field = self.state.sort_field;
        let direction = self.state.sort_direction;
        let mut rows: Vec<&'a Campaign> = records.into_iter().collect();
        rows.sort_by(|a, b| direction.apply(field.compare(a, b)));
        rows
    }

    pub fn filtered_sorted<'a>(&self, records: &'a [Campaign]) -> Vec<&'a Campaign> {
        self.sort(self.filter(records))
    }

    pub fn view<'a>(&self, records: &'a [Campaign]) -> TableView<'a> {
        let sorted = self.filtered_sorted(records);
        let page = self.state.current_page;
        TableView {
            rows: page_slice(&sorted, page).to_vec(),
            filtered_count: sorted.len(),
            total_count: records.len(),
            page,
            total_pages: total_pages(sorted.len()),
        }
    }

    /// Export projection of the full filtered and sorted result, ignoring
    /// the current page.
    pub fn to_export_rows(&self, records: &[Campaign]) -> Vec<ExportRow> {
        self.filtered_sorted(records)
            .into_iter()
            .map(Exportable::export_row)
            .collect()
    }
}

/// Rows of 1-based `page`; empty when the page is 0 or past the end.
pub fn page_slice<T>(rows: &[T], page: usize) -> &[T] {
    if page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(PAGE_SIZE);
    if start >= rows.len() {
        return &[];
    }
    let end = (start + PAGE_SIZE).min(rows.len());
    &rows[start..end]
}

pub fn total_pages(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE)
}

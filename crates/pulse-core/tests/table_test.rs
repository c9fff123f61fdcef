use pulse_api_types::{Campaign, CampaignStatus};
use pulse_core::table::*;

// ===========================================================================
// Helpers
// ===========================================================================

fn campaign(id: &str, client: &str, name: &str, revenue: f64, conversions: u64, status: CampaignStatus) -> Campaign {
    Campaign {
        id: id.to_string(),
        client: client.to_string(),
        campaign: name.to_string(),
        revenue,
        impressions: revenue as u64 * 20,
        clicks: revenue as u64 / 2,
        conversions,
        status,
    }
}

/// `count` campaigns with distinct revenue, alternating status.
fn seed(count: usize) -> Vec<Campaign> {
    (0..count)
        .map(|i| {
            let status = match i % 3 {
                0 => CampaignStatus::Active,
                1 => CampaignStatus::Paused,
                _ => CampaignStatus::Completed,
            };
            campaign(
                &format!("{i}"),
                &format!("Client {i:02}"),
                &format!("Campaign {i:02}"),
                1000.0 * (i as f64 + 1.0),
                (i as u64) * 10,
                status,
            )
        })
        .collect()
}

fn ids(rows: &[&Campaign]) -> Vec<String> {
    rows.iter().map(|c| c.id.clone()).collect()
}

// ===========================================================================
// Filter
// ===========================================================================

#[test]
fn default_state_is_revenue_descending_page_one() {
    let engine = TableEngine::new();
    let s = engine.state();
    assert_eq!(s.sort_field, SortField::Revenue);
    assert_eq!(s.sort_direction, SortDirection::Descending);
    assert_eq!(s.current_page, 1);
    assert!(!engine.has_active_filters());
}

#[test]
fn min_revenue_sample_keeps_two_records_sorted_descending() {
    let data = vec![
        campaign("1", "TechFlow Solutions", "Q4 Product Launch", 45600.0, 1250, CampaignStatus::Active),
        campaign("2", "EcoLiving Co.", "Sustainable Products", 32400.0, 890, CampaignStatus::Active),
        campaign("3", "FinanceFirst", "Investment App Promo", 58900.0, 1680, CampaignStatus::Active),
    ];
    let mut engine = TableEngine::new();
    engine.set_min_revenue(Some(40000.0));

    let rows = engine.filtered_sorted(&data);
    let revenues: Vec<f64> = rows.iter().map(|c| c.revenue).collect();
    assert_eq!(revenues, vec![58900.0, 45600.0]);
}

#[test]
fn filter_is_subset_and_idempotent() {
    let data = seed(25);
    let mut engine = TableEngine::new();
    engine.set_search("client 1");
    engine.toggle_status(CampaignStatus::Active);
    engine.toggle_status(CampaignStatus::Paused);
    engine.set_min_conversions(Some(50));

    let once = engine.filter(&data);
    assert!(!once.is_empty());
    assert!(once.iter().all(|c| data.iter().any(|d| d == *c)));

    let twice = engine.filter(once.clone());
    assert_eq!(ids(&once), ids(&twice));
}

#[test]
fn search_matches_client_or_campaign_case_insensitively() {
    let data = vec![
        campaign("1", "GreenEnergy", "Solar Solutions", 1.0, 1, CampaignStatus::Active),
        campaign("2", "ArtSpace", "Digital Art Platform", 2.0, 1, CampaignStatus::Active),
        campaign("3", "EduLearn", "Online Courses", 3.0, 1, CampaignStatus::Active),
    ];
    let mut engine = TableEngine::new();

    engine.set_search("SOLAR");
    assert_eq!(ids(&engine.filter(&data)), vec!["1"]);

    engine.set_search("art");
    assert_eq!(ids(&engine.filter(&data)), vec!["2"]);

    engine.set_search("");
    assert_eq!(engine.filter(&data).len(), 3);
}

#[test]
fn status_filter_toggles_membership() {
    let data = seed(9);
    let mut engine = TableEngine::new();

    engine.toggle_status(CampaignStatus::Completed);
    assert!(engine.filter(&data).iter().all(|c| c.status == CampaignStatus::Completed));
    assert!(engine.has_active_filters());

    engine.toggle_status(CampaignStatus::Completed);
    assert_eq!(engine.filter(&data).len(), 9);
    assert!(!engine.has_active_filters());
}

#[test]
fn filter_mutators_reset_to_first_page() {
    let mut engine = TableEngine::new();

    engine.set_page(3);
    engine.toggle_status(CampaignStatus::Active);
    assert_eq!(engine.state().current_page, 1);

    engine.set_page(3);
    engine.set_min_revenue(Some(10.0));
    assert_eq!(engine.state().current_page, 1);

    engine.set_page(3);
    engine.set_min_conversions(None);
    assert_eq!(engine.state().current_page, 1);

    engine.set_page(3);
    engine.set_search("x");
    assert_eq!(engine.state().current_page, 1);

    engine.set_page(3);
    engine.clear_filters();
    assert_eq!(engine.state().current_page, 1);
    assert!(!engine.has_active_filters());
    assert_eq!(engine.state().search_term, "x");
}

// ===========================================================================
// Sort
// ===========================================================================

#[test]
fn sort_is_idempotent_for_every_field() {
    let data = seed(15);
    for field in SortField::ALL {
        let mut engine = TableEngine::new();
        engine.set_sort(field);
        let once = engine.sort(&data);
        let twice = engine.sort(once.clone());
        assert_eq!(ids(&once), ids(&twice), "field {field}");
    }
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let data = vec![
        campaign("a", "X", "one", 500.0, 1, CampaignStatus::Paused),
        campaign("b", "X", "two", 100.0, 1, CampaignStatus::Active),
        campaign("c", "X", "three", 500.0, 1, CampaignStatus::Active),
        campaign("d", "X", "four", 500.0, 1, CampaignStatus::Completed),
    ];
    let engine = TableEngine::new();
    assert_eq!(ids(&engine.sort(&data)), vec!["a", "c", "d", "b"]);

    let mut asc = TableEngine::new();
    asc.set_sort(SortField::Revenue);
    assert_eq!(asc.state().sort_direction, SortDirection::Ascending);
    assert_eq!(ids(&asc.sort(&data)), vec!["b", "a", "c", "d"]);
}

#[test]
fn set_sort_toggles_with_period_two() {
    let data = seed(12);
    let mut engine = TableEngine::new();

    engine.set_sort(SortField::Client);
    let first = ids(&engine.sort(&data));

    engine.set_sort(SortField::Client);
    let second = ids(&engine.sort(&data));
    let mut reversed = first.clone();
    reversed.reverse();
    assert_eq!(second, reversed);

    engine.set_sort(SortField::Client);
    assert_eq!(ids(&engine.sort(&data)), first);
}

#[test]
fn new_sort_field_starts_descending() {
    let mut engine = TableEngine::new();
    engine.set_sort(SortField::Revenue);
    assert_eq!(engine.state().sort_direction, SortDirection::Ascending);

    engine.set_sort(SortField::Clicks);
    assert_eq!(engine.state().sort_field, SortField::Clicks);
    assert_eq!(engine.state().sort_direction, SortDirection::Descending);
}

#[test]
fn string_fields_sort_case_insensitively() {
    let data = vec![
        campaign("1", "beta", "x", 1.0, 1, CampaignStatus::Active),
        campaign("2", "Alpha", "x", 2.0, 1, CampaignStatus::Active),
        campaign("3", "gamma", "x", 3.0, 1, CampaignStatus::Active),
    ];
    let mut engine = TableEngine::new();
    engine.set_sort(SortField::Client);
    engine.set_sort(SortField::Client);
    assert_eq!(ids(&engine.sort(&data)), vec!["2", "1", "3"]);
}

#[test]
fn status_sorts_alphabetically() {
    let data = seed(3);
    let mut engine = TableEngine::new();
    engine.set_sort(SortField::Status);
    engine.set_sort(SortField::Status);
    let statuses: Vec<CampaignStatus> = engine.sort(&data).iter().map(|c| c.status).collect();
    assert_eq!(
        statuses,
        vec![CampaignStatus::Active, CampaignStatus::Completed, CampaignStatus::Paused]
    );
}

#[test]
fn id_sorts_as_text() {
    let data = vec![
        campaign("2", "X", "a", 1.0, 1, CampaignStatus::Active),
        campaign("10", "X", "b", 1.0, 1, CampaignStatus::Active),
        campaign("1", "X", "c", 1.0, 1, CampaignStatus::Active),
    ];
    let mut engine = TableEngine::new();
    engine.set_sort(SortField::Id);
    assert_eq!(engine.state().sort_direction, SortDirection::Descending);
    engine.set_sort(SortField::Id);
    assert_eq!(ids(&engine.sort(&data)), vec!["1", "10", "2"]);
}

#[test]
fn sort_field_parses_from_str() {
    assert_eq!("Revenue".parse::<SortField>().unwrap(), SortField::Revenue);
    assert_eq!("id".parse::<SortField>().unwrap(), SortField::Id);
    assert!("budget".parse::<SortField>().is_err());
}

// ===========================================================================
// Pagination
// ===========================================================================

#[test]
fn pages_concatenate_to_full_sequence() {
    for len in [0usize, 1, 9, 10, 11, 25, 30] {
        let data = seed(len);
        let engine = TableEngine::new();
        let sorted = engine.filtered_sorted(&data);

        let mut joined = Vec::new();
        for page in 1..=total_pages(sorted.len()) {
            let slice = page_slice(&sorted, page);
            assert!(slice.len() <= PAGE_SIZE);
            joined.extend_from_slice(slice);
        }
        assert_eq!(ids(&joined), ids(&sorted), "len {len}");
    }
}

#[test]
fn out_of_range_page_is_empty() {
    let data = seed(12);
    let mut engine = TableEngine::new();

    engine.set_page(3);
    let view = engine.view(&data);
    assert!(view.rows.is_empty());
    assert_eq!(view.range(), None);
    assert_eq!(view.total_pages, 2);

    engine.set_page(0);
    assert!(engine.view(&data).rows.is_empty());

    engine.set_page(usize::MAX);
    assert!(engine.view(&data).rows.is_empty());
}

#[test]
fn view_reports_counts_and_range() {
    let data = seed(25);
    let mut engine = TableEngine::new();
    engine.set_page(3);
    let view = engine.view(&data);
    assert_eq!(view.rows.len(), 5);
    assert_eq!(view.filtered_count, 25);
    assert_eq!(view.total_count, 25);
    assert_eq!(view.range(), Some((21, 25)));

    engine.toggle_status(CampaignStatus::Active);
    let view = engine.view(&data);
    assert_eq!(view.page, 1);
    assert_eq!(view.filtered_count, 9);
    assert_eq!(view.total_count, 25);
}

#[test]
fn navigation_helpers_clamp() {
    let mut engine = TableEngine::new();
    engine.previous_page();
    assert_eq!(engine.state().current_page, 1);

    engine.next_page(2);
    engine.next_page(2);
    assert_eq!(engine.state().current_page, 2);

    engine.next_page(0);
    assert_eq!(engine.state().current_page, 1);

    engine.set_page(usize::MAX);
    engine.next_page(usize::MAX);
    assert_eq!(engine.state().current_page, usize::MAX);
}

#[test]
fn state_survives_snapshot_replacement() {
    let mut engine = TableEngine::new();
    engine.toggle_status(CampaignStatus::Paused);

    let first = seed(6);
    assert_eq!(engine.filter(&first).len(), 2);

    let second = seed(12);
    assert_eq!(engine.filter(&second).len(), 4);
}

// ===========================================================================
// Export
// ===========================================================================

#[test]
fn export_rows_cover_filtered_set_regardless_of_page() {
    let data = seed(25);
    let mut engine = TableEngine::new();
    engine.set_min_conversions(Some(30));
    let expected = engine.filtered_sorted(&data).len();

    for page in [1, 2, 99] {
        engine.set_page(page);
        assert_eq!(engine.to_export_rows(&data).len(), expected);
    }
}

#[test]
fn export_rows_are_human_formatted() {
    let data = vec![campaign("1", "TechFlow Solutions", "Q4 Product Launch", 45600.0, 1250, CampaignStatus::Active)];
    let rows = TableEngine::new().to_export_rows(&data);
    let row = &rows[0];
    assert_eq!(row.get("Revenue"), Some("$45,600"));
    assert_eq!(row.get("Impressions"), Some("912,000"));
    assert_eq!(row.get("Conversions"), Some("1,250"));
    assert_eq!(row.get("Status"), Some("Active"));
    assert_eq!(
        row.columns().collect::<Vec<_>>(),
        vec!["Client", "Campaign", "Revenue", "Impressions", "Clicks", "Conversions", "Status"]
    );
}

pub mod campaigns;
pub mod export;
pub mod fetch;
pub mod mode;
pub mod status;
pub mod watch;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use pulse_api_types::CampaignStatus;
use pulse_client::{DataOrigin, ResilientDataService};
use pulse_core::config::Config;
use pulse_core::table::{SortDirection, SortField, TableEngine, TableState};

/// Resolved configuration shared by every subcommand.
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
}

impl AppContext {
    pub fn new(config: Config, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn service(&self) -> anyhow::Result<Arc<ResilientDataService>> {
        let service = ResilientDataService::from_config(&self.config)
            .context("failed to build the analytics API client")?;
        Ok(Arc::new(service))
    }
}

/// One-line note for stderr when data did not come from the API.
pub fn origin_note(origin: DataOrigin) -> Option<&'static str> {
    match origin {
        DataOrigin::Remote => None,
        DataOrigin::Synthetic => Some("mock mode: showing synthetic data"),
        DataOrigin::Fallback => {
            Some("analytics API unavailable: showing synthetic data (see logs for the error)")
        }
    }
}

/// Search, filter and sort options shared by `campaigns` and `export`.
#[derive(Debug, Clone, Args)]
pub struct TableArgs {
    /// Case-insensitive substring of the client or campaign name.
    #[arg(long)]
    pub search: Option<String>,
    /// Keep only campaigns with this status (repeatable).
    #[arg(long = "status")]
    pub statuses: Vec<CampaignStatus>,
    /// Minimum revenue, inclusive.
    #[arg(long)]
    pub min_revenue: Option<f64>,
    /// Minimum conversions, inclusive.
    #[arg(long)]
    pub min_conversions: Option<u64>,
    /// id, client, campaign, revenue, impressions, clicks, conversions or status.
    #[arg(long, default_value = "revenue")]
    pub sort: SortField,
    /// Sort ascending instead of descending.
    #[arg(long)]
    pub ascending: bool,
}

impl TableArgs {
    pub fn engine(&self, page: usize) -> TableEngine {
        let status_filter: BTreeSet<CampaignStatus> = self.statuses.iter().copied().collect();
        TableEngine::with_state(TableState {
            search_term: self.search.clone().unwrap_or_default(),
            status_filter,
            min_revenue: self.min_revenue,
            min_conversions: self.min_conversions,
            sort_field: self.sort,
            sort_direction: if self.ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            },
            current_page: page.max(1),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::Router;

    pub fn mock_context() -> AppContext {
        let mut config = Config::default();
        config.api.use_mock_data = true;
        AppContext::new(config, PathBuf::from("/nonexistent/pulse/config.toml"))
    }

    /// Live-mode context pointed at an in-process API.
    pub async fn live_context(app: Router) -> AppContext {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let mut config = Config::default();
        config.api.base_url = format!("http://{addr}/api/v1");
        config.api.request_timeout_secs = 5;
        config.api.max_retries = 0;
        AppContext::new(config, PathBuf::from("/nonexistent/pulse/config.toml"))
    }

    pub fn table_args() -> TableArgs {
        TableArgs {
            search: None,
            statuses: Vec::new(),
            min_revenue: None,
            min_conversions: None,
            sort: SortField::Revenue,
            ascending: false,
        }
    }
}

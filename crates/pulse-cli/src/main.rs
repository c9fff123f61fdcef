mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_api_types::Collection;
use pulse_core::config::Config;
use pulse_telemetry::logging::{self, LogFormat};

use commands::{AppContext, TableArgs};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// pulse -- marketing analytics dashboard data from the terminal.
#[derive(Parser)]
#[command(name = "pulse", version, about)]
struct Cli {
    /// Config file (default: ~/.pulse/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Analytics API base URL, overriding config and PULSE_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Serve the built-in synthetic dataset instead of calling the API.
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dashboard overview (default when no subcommand is given).
    Status,

    /// Fetch one collection.
    Fetch {
        /// revenue, channels, audience, campaigns, metrics, dashboard or mock-status.
        collection: Collection,
        /// Print the payload as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List campaigns with search, filters, sorting and paging.
    Campaigns {
        #[command(flatten)]
        table: TableArgs,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Print the visible rows as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export the filtered, sorted campaigns (all pages) to CSV.
    Export {
        #[command(flatten)]
        table: TableArgs,
        /// Title used for the file name (default: export.table_title).
        #[arg(long)]
        title: Option<String>,
        /// Output directory (default: export.output_dir).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Poll collections and print every update.
    Watch {
        /// Collections to watch (repeatable). Defaults to campaigns and metrics.
        #[arg(long = "collection")]
        collections: Vec<Collection>,
        /// Stop after this many updates.
        #[arg(long)]
        updates: Option<usize>,
        /// Poll interval in seconds, overriding the per-collection default.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show or persist the data mode.
    Mode {
        /// `mock` or `live`; writes use_mock_data to the config file.
        #[arg(long)]
        set: Option<String>,
    },
}

fn load_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = if path.exists() {
        Config::load_from(&path).with_context(|| format!("loading {}", path.display()))?
    } else {
        Config::default()
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if cli.mock {
        config.api.use_mock_data = true;
    }
    config.validate().context("invalid configuration")?;
    Ok((config, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let (config, config_path) = load_config(&cli)?;

    let format = config
        .general
        .log_format
        .parse::<LogFormat>()
        .unwrap_or_default();
    logging::init(format, "pulse", &config.general.log_level);

    let ctx = AppContext::new(config, config_path);

    match cli.command {
        None | Some(Commands::Status) => commands::status::run(&ctx).await?,
        Some(Commands::Fetch { collection, json }) => {
            commands::fetch::run(&ctx, collection, json).await?
        }
        Some(Commands::Campaigns { table, page, json }) => {
            commands::campaigns::run(&ctx, &table, page, json).await?
        }
        Some(Commands::Export { table, title, out }) => {
            commands::export::run(&ctx, &table, title.as_deref(), out.as_deref()).await?;
        }
        Some(Commands::Watch {
            collections,
            updates,
            interval,
        }) => commands::watch::run(&ctx, collections, updates, interval).await?,
        Some(Commands::Mode { set }) => commands::mode::run(&ctx, set.as_deref())?,
    }

    Ok(())
}

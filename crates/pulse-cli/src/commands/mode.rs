use anyhow::Context;
use pulse_core::config::{Config, FetchMode};

use super::AppContext;

/// Show the effective data mode, or persist a new one with `--set`.
///
/// Only the file's own settings are written back, so env and flag
/// overrides never leak into the saved config.
pub fn run(ctx: &AppContext, set: Option<&str>) -> anyhow::Result<()> {
    let Some(value) = set else {
        println!("mode:    {}", ctx.config.fetch_mode());
        println!("api:     {}", ctx.config.api.base_url);
        println!("config:  {}", ctx.config_path.display());
        return Ok(());
    };

    let mode = parse_mode(value)?;
    let path = &ctx.config_path;
    let mut config = if path.exists() {
        Config::load_from(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        Config::default()
    };
    config.api.use_mock_data = mode.is_mock();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, config.to_toml()?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("mode set to {mode} in {}", path.display());
    Ok(())
}

fn parse_mode(value: &str) -> anyhow::Result<FetchMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "mock" => Ok(FetchMode::Mock),
        "live" => Ok(FetchMode::Live),
        other => anyhow::bail!("unknown mode {other:?} (expected mock or live)"),
    }
}

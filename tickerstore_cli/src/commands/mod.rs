//! CLI subcommand implementations.

pub mod fetch;
pub mod index;
pub mod list;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tickerstore_lib::{ConfigFile, IngestConfig, PriceFetcher, YahooFetcher};

/// Flags shared by every subcommand.
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Defaults <- config file <- environment <- `overrides` (command flags).
pub fn resolve_config(global: &GlobalOpts, overrides: ConfigFile) -> Result<IngestConfig> {
    let file = ConfigFile::discover(global.config.as_deref())?;
    let env = ConfigFile::from_env()?;
    let cli = ConfigFile {
        output_dir: global.output_dir.clone(),
        ..Default::default()
    };
    let merged = file.merge(env).merge(cli).merge(overrides);
    Ok(IngestConfig::from_layers(&merged)?)
}

pub fn build_fetcher(config: &IngestConfig) -> Result<Arc<dyn PriceFetcher>> {
    let fetcher = match config.chart_base_url.as_deref() {
        Some(url) => YahooFetcher::with_base_url(url)?,
        None => YahooFetcher::new()?,
    };
    Ok(Arc::new(fetcher))
}

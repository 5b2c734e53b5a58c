//! The `fetch` subcommand: download one symbol ad hoc.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tickerstore_lib::{
    load_symbol_aliases, rebuild_manifest, with_retry, write_series, write_series_to,
    ConfigFile, DelayStrategy, Pacer, PriceFetcher, Resolution, Symbol,
};

use super::{build_fetcher, resolve_config, GlobalOpts};
use crate::output::{print_fetch_summary, FetchSummary, OutputFormat};

/// Arguments for the `fetch` subcommand.
#[derive(Args)]
pub struct FetchArgs {
    /// Ticker symbol (e.g. AAPL, BRK.B)
    pub symbol: String,

    /// Relative lookback (1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max)
    #[arg(long, default_value = "5y")]
    pub period: String,

    /// Bar interval: 1d, 1wk, or 1mo
    #[arg(long, default_value = "1d")]
    pub interval: String,

    /// Write the CSV here instead of <output-dir>/<SYMBOL>_full.csv
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Retries for rate-limited, 5xx, or network failures
    #[arg(long)]
    pub max_retries: Option<u32>,
}

pub async fn run(args: &FetchArgs, global: &GlobalOpts, format: &OutputFormat) -> Result<()> {
    let config = resolve_config(
        global,
        ConfigFile {
            period: Some(args.period.clone()),
            interval: Some(args.interval.clone()),
            max_retries: args.max_retries,
            ..Default::default()
        },
    )?;

    let symbol = Symbol::parse(&args.symbol)?;
    let target = match load_symbol_aliases()?.resolve(&symbol) {
        Resolution::Fetch(target) => target,
        Resolution::Retired => bail!("{} is retired and has no price data", symbol),
    };
    if target != symbol {
        eprintln!("{} is now listed as {}", symbol, target);
    }

    let fetcher = build_fetcher(&config)?;
    let pacer = Pacer::new(DelayStrategy::None);
    let series = with_retry(&pacer, &config.retry, target.as_str(), || {
        fetcher.fetch(&target, &config.window)
    })
    .await?;

    if series.is_empty() {
        eprintln!("No data available for {}", target);
        return Ok(());
    }

    let path = match &args.out {
        Some(out) => {
            write_series_to(out, &series)?;
            out.clone()
        }
        None => {
            let path = write_series(&config.output_dir, &target, &series)?;
            rebuild_manifest(&config.output_dir)?;
            path
        }
    };

    print_fetch_summary(
        &FetchSummary {
            symbol: target,
            rows: series.len(),
            first: series.first_date(),
            last: series.last_date(),
            path,
        },
        format,
    )?;
    Ok(())
}

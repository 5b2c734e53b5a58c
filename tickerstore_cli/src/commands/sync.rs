//! The `sync` subcommand: fetch every symbol, write CSVs, rebuild the manifest.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tickerstore_lib::alias::read_symbol_aliases;
use tickerstore_lib::{
    load_symbol_aliases, ConfigFile, FileSource, Ingestor, MembershipClient,
    MembershipTableSource, ProgressEvent, StaticSource, TickerSource,
};

use super::{build_fetcher, resolve_config, GlobalOpts};
use crate::output::{print_batch_report, OutputFormat};

/// Arguments for the `sync` subcommand.
#[derive(Args)]
pub struct SyncArgs {
    /// Comma-separated symbols to fetch instead of the membership table
    #[arg(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// File with one symbol per line (`#` starts a comment)
    #[arg(long, conflicts_with = "symbols")]
    pub symbols_file: Option<PathBuf>,

    /// First date to fetch (YYYY-MM-DD, default 1980-01-01)
    #[arg(long)]
    pub start: Option<String>,

    /// Last date to fetch, exclusive (YYYY-MM-DD, default today)
    #[arg(long)]
    pub end: Option<String>,

    /// Relative lookback (1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max); overrides --start/--end
    #[arg(long)]
    pub period: Option<String>,

    /// Bar interval: 1d, 1wk, or 1mo
    #[arg(long)]
    pub interval: Option<String>,

    /// Delay between request starts in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Extra random delay added on top of --delay-ms
    #[arg(long)]
    pub jitter_ms: Option<u64>,

    /// Symbols fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Retries for rate-limited, 5xx, or network failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Alias YAML layered over the built-in alias table
    #[arg(long)]
    pub aliases: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl SyncArgs {
    fn config_layer(&self) -> ConfigFile {
        ConfigFile {
            start_date: self.start.clone(),
            end_date: self.end.clone(),
            period: self.period.clone(),
            interval: self.interval.clone(),
            delay_ms: self.delay_ms,
            jitter_ms: self.jitter_ms,
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            ..Default::default()
        }
    }
}

pub async fn run(
    args: &SyncArgs,
    global: &GlobalOpts,
    format: &OutputFormat,
    bars: &MultiProgress,
) -> Result<()> {
    let config = resolve_config(global, args.config_layer())?;

    let source: Arc<dyn TickerSource> = if !args.symbols.is_empty() {
        Arc::new(StaticSource::new(args.symbols.iter().cloned()))
    } else if let Some(path) = &args.symbols_file {
        Arc::new(FileSource::new(path))
    } else {
        Arc::new(MembershipTableSource::new(MembershipClient::with_url(
            &config.membership_url,
        )?))
    };

    let mut aliases = load_symbol_aliases()?;
    if let Some(path) = &args.aliases {
        aliases.extend(read_symbol_aliases(path)?);
    }

    eprintln!(
        "Syncing {} into {}",
        source.describe(),
        config.output_dir.display()
    );

    let fetcher = build_fetcher(&config)?;
    let ingestor = Ingestor::new(config, source, fetcher).with_aliases(aliases);

    let cancel = ingestor.cancel_flag();
    let interrupt_bars = bars.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt_bars.suspend(|| {
                eprintln!("Interrupted: finishing in-flight symbols, then rebuilding the manifest")
            });
            cancel.cancel();
        }
    });

    let pb = if args.no_progress {
        ProgressBar::hidden()
    } else {
        bars.add(ProgressBar::new(0))
    };
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
    )?);

    let report = ingestor
        .run_with_progress(|event| match event {
            ProgressEvent::Planned { total } => {
                pb.set_length(total as u64);
                pb.set_message("downloading...");
            }
            ProgressEvent::Completed { report, .. } => {
                pb.inc(1);
                pb.set_message(report.fetched_as.to_string());
            }
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    print_batch_report(&report, format)?;
    Ok(())
}

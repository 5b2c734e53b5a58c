//! The `list` subcommand: show persisted symbols with row counts and spans.

use anyhow::Result;
use clap::Args;
use tickerstore_lib::{build_manifest, summarize_series, ConfigFile, SeriesSummary};

use super::{resolve_config, GlobalOpts};
use crate::output::{
    print_json, print_series_csv, print_series_markdown, print_series_table, OutputFormat,
};

/// Arguments for the `list` subcommand.
#[derive(Args)]
pub struct ListArgs {
    /// Only list symbols starting with this prefix (case-insensitive)
    #[arg(long)]
    pub prefix: Option<String>,
}

pub fn run(args: &ListArgs, global: &GlobalOpts, format: &OutputFormat) -> Result<()> {
    let config = resolve_config(global, ConfigFile::default())?;
    let manifest = build_manifest(&config.output_dir)?;
    let prefix = args.prefix.as_deref().map(|p| p.trim().to_uppercase());

    let mut summaries: Vec<SeriesSummary> = Vec::new();
    for symbol in manifest.iter() {
        if let Some(p) = &prefix {
            if !symbol.as_str().starts_with(p.as_str()) {
                continue;
            }
        }
        match summarize_series(&config.output_dir, symbol) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!("{}: unreadable: {}", symbol, e),
        }
    }

    if summaries.is_empty() {
        eprintln!("No series found in {}", config.output_dir.display());
    }

    match format {
        OutputFormat::Table => print_series_table(&summaries),
        OutputFormat::Json => print_json(&summaries),
        OutputFormat::Csv => print_series_csv(&summaries)?,
        OutputFormat::Markdown => print_series_markdown(&summaries),
    }
    Ok(())
}

mod commands;
mod output;
mod progress;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::MultiProgress;

use crate::commands::GlobalOpts;
use crate::output::OutputFormat;
use crate::progress::BarAwareWriter;

#[derive(Parser)]
#[command(name = "tickerstore")]
#[command(about = "Download daily closing prices into per-symbol CSV files")]
struct Cli {
    /// Output format: table, json, csv, or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Config file (default: ./tickerstore.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for <SYMBOL>_full.csv files and tickers.json
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every symbol, write CSVs, and rebuild the manifest
    Sync(Box<commands::sync::SyncArgs>),
    /// Download a single symbol
    Fetch(commands::fetch::FetchArgs),
    /// Rebuild tickers.json from the output directory
    Index,
    /// List persisted symbols with row counts and date spans
    List(commands::list::ListArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let bars = MultiProgress::new();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tickerstore=info".parse()?),
        )
        .with_target(false)
        .with_writer(BarAwareWriter::stderr(bars.clone()))
        .init();

    let cli = Cli::parse();

    let format = OutputFormat::from_name(&cli.output);
    let global = GlobalOpts {
        config: cli.config.clone(),
        output_dir: cli.output_dir.clone(),
    };

    match &cli.command {
        Commands::Sync(args) => {
            commands::sync::run(args.as_ref(), &global, &format, &bars).await?
        }
        Commands::Fetch(args) => commands::fetch::run(args, &global, &format).await?,
        Commands::Index => commands::index::run(&global, &format)?,
        Commands::List(args) => commands::list::run(args, &global, &format)?,
    }

    Ok(())
}

//! Library layer for tickerstore: batch download of daily closing prices into
//! per-symbol CSV files plus a `tickers.json` manifest.
//!
//! Wraps the `marketdata_api` chart client with symbol normalization, alias
//! resolution, request pacing and retries, atomic file writes, and a bounded
//! concurrency batch pipeline.

pub mod alias;
pub mod config;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod pipeline;
pub mod queue;
pub mod rate_limiter;
pub mod scrape;
pub mod series;
pub mod source;
pub mod store;
pub mod symbol;

pub use marketdata_api;
pub use marketdata_api::{ChartSpan, Interval, Range};

pub use alias::{load_symbol_aliases, parse_symbol_aliases, AliasError, Resolution, SymbolAliases};
pub use config::{ConfigError, ConfigFile, IngestConfig};
pub use error::IngestError;
pub use fetch::{FetchError, FetchWindow, PriceFetcher, YahooFetcher};
pub use manifest::{
    build_manifest, read_manifest, rebuild_manifest, write_manifest, Manifest, ManifestError,
    MANIFEST_FILE,
};
pub use pipeline::{BatchReport, FailedSymbol, Ingestor, ProgressEvent, SymbolOutcome, SymbolReport};
pub use queue::{CancelFlag, TaskQueue};
pub use rate_limiter::{with_retry, DelayStrategy, Pacer, RetryPolicy, TrackerSummary};
pub use scrape::{MembershipClient, ScrapeError};
pub use series::{PricePoint, PriceSeries};
pub use source::{FileSource, MembershipTableSource, StaticSource, TickerSource};
pub use store::{
    read_series, series_path, summarize_series, write_series, write_series_to, SeriesSummary,
    WriteError, SERIES_SUFFIX,
};
pub use symbol::{normalize, Symbol, SymbolError};

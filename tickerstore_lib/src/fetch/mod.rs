//! Per-symbol price history fetching.
//!
//! [`PriceFetcher`] is the seam between the batch pipeline and a data
//! provider. An empty [`PriceSeries`] means "no data available" and is not an
//! error; the pipeline skips persistence for it.

pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;
use marketdata_api::{ChartQuery, ChartSpan, Interval, QueryCommon, Range};
use thiserror::Error;

use crate::series::PriceSeries;
use crate::symbol::Symbol;

pub use yahoo::YahooFetcher;

/// Errors from a single symbol fetch. None of these abort a batch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Rate limited by provider (HTTP 429)")]
    RateLimited,
    /// The provider says the symbol does not exist or has no history at all.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Network error")]
    Network,
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    ParseFailed(String),
}

impl FetchError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RateLimited | FetchError::Network => true,
            FetchError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<marketdata_api::Error> for FetchError {
    fn from(e: marketdata_api::Error) -> Self {
        match e {
            marketdata_api::Error::RequestFailed => FetchError::Network,
            marketdata_api::Error::RateLimited => FetchError::RateLimited,
            marketdata_api::Error::HttpStatus { status, body } => {
                FetchError::HttpStatus { status, body }
            }
            marketdata_api::Error::Provider { code, description } => {
                if code.eq_ignore_ascii_case("not found") {
                    FetchError::UnknownSymbol(description)
                } else {
                    FetchError::Provider(format!("{}: {}", code, description))
                }
            }
            marketdata_api::Error::Parse(msg) => FetchError::ParseFailed(msg),
        }
    }
}

/// The slice of history to request for every symbol in a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchWindow {
    pub span: ChartSpan,
    pub interval: Interval,
}

impl FetchWindow {
    /// From `start` up to today.
    pub fn since(start: NaiveDate) -> Self {
        Self {
            span: ChartSpan::Between { start, end: None },
            interval: Interval::default(),
        }
    }

    /// From `start` (inclusive) to `end` (exclusive).
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            span: ChartSpan::Between {
                start,
                end: Some(end),
            },
            interval: Interval::default(),
        }
    }

    /// Relative lookback such as `5y`.
    pub fn period(range: Range) -> Self {
        Self {
            span: ChartSpan::Range(range),
            interval: Interval::default(),
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn to_chart_query(&self) -> ChartQuery {
        ChartQuery {
            common: QueryCommon {
                interval: self.interval,
                include_pre_post: false,
            },
            span: self.span,
        }
    }
}

/// A source of closing-price history for one symbol at a time.
///
/// Implementations hold no per-symbol state, so one fetcher can be shared
/// across concurrent tasks.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(&self, symbol: &Symbol, window: &FetchWindow)
        -> Result<PriceSeries, FetchError>;
}

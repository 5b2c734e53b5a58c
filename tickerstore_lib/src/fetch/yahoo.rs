//! Yahoo Finance chart fetcher.
//!
//! Converts chart bars into a [`PriceSeries`] of adjusted closes (raw close
//! where the provider sent no adjusted value). Bar timestamps are
//! shifted by the exchange GMT offset before taking the calendar date, so a
//! 09:30 New York open lands on the New York trading day.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use marketdata_api::types::ChartResult;

use super::{FetchError, FetchWindow, PriceFetcher};
use crate::series::{PricePoint, PriceSeries};
use crate::symbol::Symbol;

/// Chart-API backed [`PriceFetcher`].
pub struct YahooFetcher {
    client: marketdata_api::Client,
}

impl YahooFetcher {
    /// Create a fetcher against the production chart endpoint.
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            client: marketdata_api::Client::new()?,
        })
    }

    /// Create a fetcher with a custom chart base URL (for testing with wiremock).
    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client: marketdata_api::Client::with_base_url(base_url)?,
        })
    }
}

#[async_trait]
impl PriceFetcher for YahooFetcher {
    async fn fetch(
        &self,
        symbol: &Symbol,
        window: &FetchWindow,
    ) -> Result<PriceSeries, FetchError> {
        let chart = self
            .client
            .get_chart(symbol.as_str(), &window.to_chart_query())
            .await?;
        Ok(chart.map(|c| series_from_chart(&c)).unwrap_or_default())
    }
}

/// Convert a unix timestamp plus exchange offset to the exchange-local date.
pub fn exchange_date(timestamp: i64, gmt_offset: i64) -> Option<NaiveDate> {
    let local = timestamp.checked_add(gmt_offset)?;
    DateTime::from_timestamp(local, 0).map(|dt| dt.date_naive())
}

/// Build a close series from a chart result, skipping bars with null closes.
pub fn series_from_chart(chart: &ChartResult) -> PriceSeries {
    let offset = chart.gmt_offset();
    PriceSeries::from_points(chart.adjusted_closes().into_iter().filter_map(|(ts, close)| {
        let close = close?;
        let date = exchange_date(ts, offset)?;
        Some(PricePoint::new(date, close))
    }))
}

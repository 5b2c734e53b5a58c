//! HTTP client for the Yahoo Finance chart API.

use std::time::Duration;

use url::Url;

use crate::{
    query::{ChartQuery, Query},
    types::{ChartEnvelope, ChartResult},
    user_agent::get_user_agent,
    Error,
};

const DEFAULT_BASE_CHART: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// HTTP client for the chart API.
///
/// Sends requests with browser-like headers and a randomized user agent
/// chosen when the client is built. Requests time out after 30 seconds.
pub struct Client {
    /// Base URL for the chart endpoint, without a trailing slash.
    base_chart_url: String,
    http: reqwest::Client,
}

impl Client {
    /// Creates a new client pointing at the production chart API.
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_CHART)
    }

    /// Creates a new client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        Ok(Self {
            base_chart_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_chart_url
    }

    fn get_url(&self, symbol: &str, query: &impl Query) -> Result<Url, Error> {
        let mut url = Url::parse(&self.base_chart_url).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                tracing::error!("Base URL cannot carry a path: {}", self.base_chart_url);
                Error::RequestFailed
            })?
            .pop_if_empty()
            .push(symbol);
        Ok(query.add_to_url(&url))
    }

    /// Fetches the chart for one symbol.
    ///
    /// Returns `Ok(None)` when the provider answers with an empty result set
    /// and no error object. Provider error objects become [`Error::Provider`],
    /// whether they arrive with HTTP 200 or with an error status such as 404.
    pub async fn get_chart(
        &self,
        symbol: &str,
        query: &ChartQuery,
    ) -> Result<Option<ChartResult>, Error> {
        let url = self.get_url(symbol, query)?;
        tracing::debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .header("accept", "application/json, text/plain, */*")
            .header("accept-language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to get chart for {}: {}", symbol, e);
                Error::RequestFailed
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }

        let parsed = serde_json::from_str::<ChartEnvelope>(&body);

        if !status.is_success() {
            if let Some(err) = parsed
                .ok()
                .and_then(|env| env.chart)
                .and_then(|node| node.error)
            {
                return Err(Error::Provider {
                    code: err.code,
                    description: err.description,
                });
            }
            let snippet = truncate_body(&body);
            tracing::debug!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let envelope = parsed.map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::debug!("Failed to parse chart: {} | body: {}", e, snippet);
            Error::Parse(e.to_string())
        })?;

        let node = envelope
            .chart
            .ok_or_else(|| Error::Parse("missing chart node".to_string()))?;
        if let Some(err) = node.error {
            return Err(Error::Provider {
                code: err.code,
                description: err.description,
            });
        }
        Ok(node.result.and_then(|results| results.into_iter().next()))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

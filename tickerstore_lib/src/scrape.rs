//! Index membership table scraping (no API).
//!
//! The constituents page is plain server-rendered HTML. We pull the table
//! with regexes rather than a DOM parser: locate the table, find the header
//! cell named `Symbol`, and read that column from every data row.

use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;

use marketdata_api::get_user_agent;

pub const DEFAULT_MEMBERSHIP_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// Header text of the column holding ticker symbols.
pub const SYMBOL_COLUMN: &str = "Symbol";

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    HttpStatus { status: StatusCode },
    #[error("no table found in page")]
    MissingTable,
    #[error("table has no '{0}' column")]
    MissingColumn(String),
    #[error("row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
    #[error("parse error: {0}")]
    Parse(String),
}

pub struct MembershipClient {
    url: String,
    http: reqwest::Client,
}

impl MembershipClient {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_url(DEFAULT_MEMBERSHIP_URL)
    }

    /// Point at a different page (for testing with wiremock).
    pub fn with_url(url: &str) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the page and return the raw symbol cells in row order.
    pub async fn fetch_symbols(&self) -> Result<Vec<String>, ScrapeError> {
        let html = self.fetch_html(&self.url).await?;
        extract_symbol_column(&html, SYMBOL_COLUMN)
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        let resp = self
            .http
            .get(url)
            .header("accept", "text/html,application/xhtml+xml")
            .header("accept-language", "en-US,en;q=0.9")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ScrapeError::HttpStatus {
                status: resp.status(),
            });
        }

        Ok(resp.text().await?)
    }
}

fn regex(pattern: &str) -> Result<Regex, ScrapeError> {
    Regex::new(pattern).map_err(|e| ScrapeError::Parse(format!("regex error: {}", e)))
}

/// Return the body of the constituents table, or of the first table when no
/// table carries `id="constituents"`.
fn select_table(html: &str) -> Result<&str, ScrapeError> {
    let table_re = regex(r"(?is)<table\b([^>]*)>(.*?)</table>")?;
    let mut first = None;
    for caps in table_re.captures_iter(html) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let Some(body) = caps.get(2) else { continue };
        if attrs.contains("id=\"constituents\"") {
            return Ok(body.as_str());
        }
        if first.is_none() {
            first = Some(body.as_str());
        }
    }
    first.ok_or(ScrapeError::MissingTable)
}

/// Plain text of a cell: tags removed, common entities decoded, whitespace
/// collapsed.
fn cell_text(raw: &str, tag_re: &Regex) -> String {
    let stripped = tag_re.replace_all(raw, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract one column of a membership table by header name.
///
/// Rows with only `<th>` cells are headers; the first one fixes the column
/// index. Every later data row must have a non-empty cell at that index.
pub fn extract_symbol_column(html: &str, column: &str) -> Result<Vec<String>, ScrapeError> {
    let table = select_table(html)?;
    let row_re = regex(r"(?is)<tr\b[^>]*>(.*?)</tr>")?;
    let cell_re = regex(r"(?is)<(th|td)\b[^>]*>(.*?)</t[hd]>")?;
    let tag_re = regex(r"(?s)<[^>]*>")?;

    let mut column_idx: Option<usize> = None;
    let mut symbols = Vec::new();

    for (row_no, row) in row_re.captures_iter(table).enumerate() {
        let Some(row_body) = row.get(1) else { continue };
        let cells: Vec<(bool, String)> = cell_re
            .captures_iter(row_body.as_str())
            .map(|c| {
                let is_header = c.get(1).is_some_and(|m| m.as_str().eq_ignore_ascii_case("th"));
                let text = c.get(2).map(|m| cell_text(m.as_str(), &tag_re)).unwrap_or_default();
                (is_header, text)
            })
            .collect();

        if cells.is_empty() {
            continue;
        }

        let all_header = cells.iter().all(|(is_header, _)| *is_header);
        match column_idx {
            None if all_header => {
                let idx = cells
                    .iter()
                    .position(|(_, text)| text.eq_ignore_ascii_case(column))
                    .ok_or_else(|| ScrapeError::MissingColumn(column.to_string()))?;
                column_idx = Some(idx);
            }
            None => return Err(ScrapeError::MissingColumn(column.to_string())),
            Some(_) if all_header => {}
            Some(idx) => {
                let value = cells.get(idx).map(|(_, text)| text.as_str()).ok_or_else(|| {
                    ScrapeError::MalformedRow {
                        row: row_no,
                        reason: format!("expected at least {} cells, found {}", idx + 1, cells.len()),
                    }
                })?;
                if value.is_empty() {
                    return Err(ScrapeError::MalformedRow {
                        row: row_no,
                        reason: format!("empty '{}' cell", column),
                    });
                }
                symbols.push(value.to_string());
            }
        }
    }

    if column_idx.is_none() {
        return Err(ScrapeError::MissingColumn(column.to_string()));
    }
    Ok(symbols)
}

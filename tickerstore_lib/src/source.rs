//! Ticker list providers.
//!
//! Every [`TickerSource`] returns normalized symbols, deduplicated with the
//! first occurrence winning, in source order.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::IngestError;
use crate::scrape::MembershipClient;
use crate::symbol::{Symbol, SymbolError};

#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn symbols(&self) -> Result<Vec<Symbol>, IngestError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Result of normalizing a raw symbol list.
#[derive(Debug, Default)]
pub struct CollectedSymbols {
    pub symbols: Vec<Symbol>,
    pub rejected: Vec<(String, SymbolError)>,
}

/// Normalize, validate, and dedup raw symbols in order.
pub fn collect_symbols<I, S>(raw: I) -> CollectedSymbols
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = CollectedSymbols::default();
    for item in raw {
        let item = item.as_ref();
        match Symbol::parse(item) {
            Ok(sym) => {
                if seen.insert(sym.clone()) {
                    out.symbols.push(sym);
                }
            }
            Err(e) => out.rejected.push((item.to_string(), e)),
        }
    }
    out
}

/// A literal list of symbols, e.g. from the command line.
pub struct StaticSource {
    raw: Vec<String>,
}

impl StaticSource {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            raw: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl TickerSource for StaticSource {
    async fn symbols(&self) -> Result<Vec<Symbol>, IngestError> {
        let collected = collect_symbols(&self.raw);
        if let Some((raw, err)) = collected.rejected.into_iter().next() {
            return Err(IngestError::InvalidSymbol(format!("'{}': {}", raw, err)));
        }
        Ok(collected.symbols)
    }

    fn describe(&self) -> String {
        format!("{} symbol(s) from command line", self.raw.len())
    }
}

/// Newline-separated symbols file. Blank lines and `#` comments are ignored;
/// invalid entries are logged and skipped.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Symbols from file content, with comments and blank lines dropped.
pub fn parse_symbol_lines(content: &str) -> CollectedSymbols {
    collect_symbols(
        content
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty()),
    )
}

#[async_trait]
impl TickerSource for FileSource {
    async fn symbols(&self) -> Result<Vec<Symbol>, IngestError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            IngestError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let collected = parse_symbol_lines(&content);
        for (raw, err) in &collected.rejected {
            tracing::warn!("Skipping '{}' in {}: {}", raw, self.path.display(), err);
        }
        Ok(collected.symbols)
    }

    fn describe(&self) -> String {
        format!("symbols file {}", self.path.display())
    }
}

/// Constituents of the index membership page.
pub struct MembershipTableSource {
    client: MembershipClient,
}

impl MembershipTableSource {
    pub fn new(client: MembershipClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TickerSource for MembershipTableSource {
    async fn symbols(&self) -> Result<Vec<Symbol>, IngestError> {
        let raw = self
            .client
            .fetch_symbols()
            .await
            .map_err(|e| IngestError::SourceUnavailable(format!("{}: {}", self.client.url(), e)))?;
        let collected = collect_symbols(&raw);
        for (raw, err) in &collected.rejected {
            tracing::warn!("Skipping membership entry '{}': {}", raw, err);
        }
        if collected.symbols.is_empty() {
            return Err(IngestError::SourceUnavailable(format!(
                "{}: membership table has no symbols",
                self.client.url()
            )));
        }
        tracing::info!("Membership table lists {} symbols", collected.symbols.len());
        Ok(collected.symbols)
    }

    fn describe(&self) -> String {
        format!("membership table {}", self.client.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn collect_dedups_first_occurrence_wins() {
        let collected = collect_symbols(["tsla", "AAPL", "BRK.B", "TSLA", "brk-b"]);
        assert_eq!(names(&collected.symbols), vec!["TSLA", "AAPL", "BRK-B"]);
        assert!(collected.rejected.is_empty());
    }

    #[test]
    fn collect_reports_rejected() {
        let collected = collect_symbols(["AAPL", "", "A B"]);
        assert_eq!(names(&collected.symbols), vec!["AAPL"]);
        assert_eq!(collected.rejected.len(), 2);
    }

    #[test]
    fn parse_symbol_lines_skips_comments() {
        let content = "# watchlist\nAAPL\n\n  msft  # software\nBRK.B\n#TSLA\n";
        let collected = parse_symbol_lines(content);
        assert_eq!(names(&collected.symbols), vec!["AAPL", "MSFT", "BRK-B"]);
    }

    #[tokio::test]
    async fn static_source_normalizes() {
        let source = StaticSource::new(["brk.b", "AAPL"]);
        let symbols = source.symbols().await.unwrap();
        assert_eq!(names(&symbols), vec!["BRK-B", "AAPL"]);
    }

    #[tokio::test]
    async fn static_source_rejects_invalid() {
        let source = StaticSource::new(["AAPL", "../etc"]);
        assert!(matches!(
            source.symbols().await,
            Err(IngestError::InvalidSymbol(_))
        ));
    }

    #[tokio::test]
    async fn file_source_missing_file_is_unavailable() {
        let source = FileSource::new("/nonexistent/tickerstore/symbols.txt");
        assert!(matches!(
            source.symbols().await,
            Err(IngestError::SourceUnavailable(_))
        ));
    }
}

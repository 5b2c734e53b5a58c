//! Batch ingestion: symbols -> fetch -> write -> manifest.
//!
//! Per-symbol failures are collected into the [`BatchReport`] and never stop
//! the batch. Only a source failure or a manifest write failure is fatal. The
//! manifest is rebuilt from the output directory after every worker has
//! finished, including after cancellation.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alias::{Resolution, SymbolAliases};
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::fetch::{FetchWindow, PriceFetcher};
use crate::manifest::rebuild_manifest;
use crate::queue::{CancelFlag, TaskQueue};
use crate::rate_limiter::{with_retry, Pacer, RetryPolicy, TrackerSummary};
use crate::source::TickerSource;
use crate::store::write_series;
use crate::symbol::Symbol;

/// What happened to one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Written { path: PathBuf, rows: usize },
    /// Provider returned no rows; nothing written.
    Empty,
    FetchFailed(String),
    WriteFailed(String),
    /// Not requested (alias marks it retired).
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    /// Symbol as listed by the source.
    pub symbol: Symbol,
    /// Symbol actually requested, after alias resolution.
    pub fetched_as: Symbol,
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedSymbol {
    pub symbol: Symbol,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Symbols handed to a worker.
    pub attempted: usize,
    pub written: usize,
    pub empty: Vec<Symbol>,
    pub skipped: Vec<Symbol>,
    pub failures: Vec<FailedSymbol>,
    /// Symbols never started because the run was cancelled.
    pub cancelled: Vec<Symbol>,
    pub manifest_size: usize,
    pub requests: TrackerSummary,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record(&mut self, report: &SymbolReport) {
        match &report.outcome {
            SymbolOutcome::Written { .. } => self.written += 1,
            SymbolOutcome::Empty => self.empty.push(report.symbol.clone()),
            SymbolOutcome::FetchFailed(e) | SymbolOutcome::WriteFailed(e) => {
                self.failures.push(FailedSymbol {
                    symbol: report.symbol.clone(),
                    error: e.clone(),
                })
            }
            SymbolOutcome::Skipped(_) => self.skipped.push(report.symbol.clone()),
        }
    }
}

/// Progress notifications delivered on the caller's task.
#[derive(Debug)]
pub enum ProgressEvent<'a> {
    /// Symbols resolved; `total` will be attempted.
    Planned { total: usize },
    /// One symbol finished. `done` counts completions so far.
    Completed {
        done: usize,
        total: usize,
        report: &'a SymbolReport,
    },
}

#[derive(Debug, Clone)]
struct Job {
    index: usize,
    symbol: Symbol,
    target: Symbol,
}

pub struct Ingestor {
    config: IngestConfig,
    source: Arc<dyn TickerSource>,
    fetcher: Arc<dyn PriceFetcher>,
    aliases: SymbolAliases,
    pacer: Arc<Pacer>,
    cancel: CancelFlag,
}

impl Ingestor {
    pub fn new(
        config: IngestConfig,
        source: Arc<dyn TickerSource>,
        fetcher: Arc<dyn PriceFetcher>,
    ) -> Self {
        let pacer = Arc::new(Pacer::new(config.delay));
        Self {
            config,
            source,
            fetcher,
            aliases: SymbolAliases::new(),
            pacer,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: SymbolAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Flag that stops scheduling new symbols when set.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn run(&self) -> Result<BatchReport, IngestError> {
        self.run_with_progress(|_| {}).await
    }

    pub async fn run_with_progress<P>(&self, mut on_progress: P) -> Result<BatchReport, IngestError>
    where
        P: FnMut(ProgressEvent<'_>),
    {
        let symbols = self.source.symbols().await?;
        info!(
            "Loaded {} symbols from {}",
            symbols.len(),
            self.source.describe()
        );

        let mut report = BatchReport::default();
        let (jobs, retired) = self.plan(symbols);
        for symbol in retired {
            info!("Skipping {}: retired symbol", symbol);
            let skipped = SymbolReport {
                symbol: symbol.clone(),
                fetched_as: symbol,
                outcome: SymbolOutcome::Skipped("retired symbol".to_string()),
            };
            report.record(&skipped);
        }

        let total = jobs.len();
        on_progress(ProgressEvent::Planned { total });

        let queue = TaskQueue::new(self.config.concurrency).with_cancel(self.cancel.clone());
        let work = {
            let fetcher = Arc::clone(&self.fetcher);
            let pacer = Arc::clone(&self.pacer);
            let window = self.config.window;
            let retry = self.config.retry;
            let output_dir = self.config.output_dir.clone();
            move |job: Job| {
                let fetcher = Arc::clone(&fetcher);
                let pacer = Arc::clone(&pacer);
                let output_dir = output_dir.clone();
                async move {
                    process_symbol(job, total, fetcher, pacer, window, retry, output_dir).await
                }
            }
        };

        let mut finished: HashSet<Symbol> = HashSet::new();
        let mut done = 0usize;
        let outcome = queue
            .run(jobs.clone(), work, |symbol_report: SymbolReport| {
                done += 1;
                report.attempted += 1;
                report.record(&symbol_report);
                finished.insert(symbol_report.symbol.clone());
                on_progress(ProgressEvent::Completed {
                    done,
                    total,
                    report: &symbol_report,
                });
            })
            .await;

        let unscheduled: HashSet<Symbol> =
            outcome.unscheduled.iter().map(|j| j.symbol.clone()).collect();
        for job in &jobs {
            if unscheduled.contains(&job.symbol) {
                report.cancelled.push(job.symbol.clone());
            } else if !finished.contains(&job.symbol) {
                report.attempted += 1;
                report.failures.push(FailedSymbol {
                    symbol: job.symbol.clone(),
                    error: "worker task panicked".to_string(),
                });
            }
        }
        if !report.cancelled.is_empty() {
            warn!(
                "Cancelled: {} symbols were not attempted",
                report.cancelled.len()
            );
        }

        let manifest = rebuild_manifest(&self.config.output_dir)?;
        report.manifest_size = manifest.len();
        report.requests = self.pacer.tracker().summary();

        info!(
            "Done: {} written, {} empty, {} failed, {} skipped; manifest has {} symbols",
            report.written,
            report.empty.len(),
            report.failed(),
            report.skipped.len(),
            report.manifest_size
        );
        Ok(report)
    }

    /// Apply aliases and drop symbols whose target was already planned.
    fn plan(&self, symbols: Vec<Symbol>) -> (Vec<Job>, Vec<Symbol>) {
        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        let mut retired = Vec::new();
        for symbol in symbols {
            match self.aliases.resolve(&symbol) {
                Resolution::Retired => retired.push(symbol),
                Resolution::Fetch(target) => {
                    if target != symbol {
                        debug!("{} resolves to {}", symbol, target);
                    }
                    if seen.insert(target.clone()) {
                        jobs.push(Job {
                            index: jobs.len(),
                            symbol,
                            target,
                        });
                    } else {
                        debug!("{} already queued as {}", symbol, target);
                    }
                }
            }
        }
        (jobs, retired)
    }
}

async fn process_symbol(
    job: Job,
    total: usize,
    fetcher: Arc<dyn PriceFetcher>,
    pacer: Arc<Pacer>,
    window: FetchWindow,
    retry: RetryPolicy,
    output_dir: PathBuf,
) -> SymbolReport {
    info!("({}/{}) Downloading {}...", job.index + 1, total, job.target);

    let fetched = with_retry(&pacer, &retry, job.target.as_str(), || {
        fetcher.fetch(&job.target, &window)
    })
    .await;

    let outcome = match fetched {
        Err(e) => {
            warn!("{}: fetch failed: {}", job.target, e);
            SymbolOutcome::FetchFailed(e.to_string())
        }
        Ok(series) if series.is_empty() => {
            debug!("{}: no data available, skipping", job.target);
            SymbolOutcome::Empty
        }
        Ok(series) => {
            let rows = series.len();
            let target = job.target.clone();
            let written =
                tokio::task::spawn_blocking(move || write_series(&output_dir, &target, &series))
                    .await;
            match written {
                Ok(Ok(path)) => {
                    debug!("{}: wrote {} rows to {}", job.target, rows, path.display());
                    SymbolOutcome::Written { path, rows }
                }
                Ok(Err(e)) => {
                    warn!("{}: write failed: {}", job.target, e);
                    SymbolOutcome::WriteFailed(e.to_string())
                }
                Err(e) => {
                    warn!("{}: write task failed: {}", job.target, e);
                    SymbolOutcome::WriteFailed(e.to_string())
                }
            }
        }
    };

    SymbolReport {
        symbol: job.symbol,
        fetched_as: job.target,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::parse_symbol_aliases;
    use crate::fetch::FetchError;
    use crate::rate_limiter::DelayStrategy;
    use crate::series::{PricePoint, PriceSeries};
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    struct RecordingFetcher {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PriceFetcher for RecordingFetcher {
        async fn fetch(&self, symbol: &Symbol, _: &FetchWindow) -> Result<PriceSeries, FetchError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            Ok(PriceSeries::from_points(vec![PricePoint::new(
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                10.0,
            )]))
        }
    }

    fn config(dir: &std::path::Path) -> IngestConfig {
        IngestConfig {
            output_dir: dir.to_path_buf(),
            delay: DelayStrategy::None,
            ..IngestConfig::default()
        }
    }

    #[tokio::test]
    async fn aliases_redirect_and_retire() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(RecordingFetcher {
            calls: Mutex::new(Vec::new()),
        });
        let aliases = parse_symbol_aliases(
            "aliases:\n  - from: FB\n    to: META\n  - from: ATVI\n    to: ~\n",
        )
        .unwrap();
        let ingestor = Ingestor::new(
            config(dir.path()),
            Arc::new(StaticSource::new(["FB", "ATVI", "META", "AAPL"])),
            fetcher.clone(),
        )
        .with_aliases(aliases);

        let report = ingestor.run().await.unwrap();

        assert_eq!(*fetcher.calls.lock().unwrap(), vec!["META", "AAPL"]);
        assert_eq!(report.written, 2);
        assert_eq!(report.skipped, vec![Symbol::parse("ATVI").unwrap()]);
        assert_eq!(report.manifest_size, 2);
        assert!(dir.path().join("META_full.csv").exists());
        assert!(!dir.path().join("FB_full.csv").exists());
    }

    #[tokio::test]
    async fn progress_events_cover_every_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = Ingestor::new(
            config(dir.path()),
            Arc::new(StaticSource::new(["A", "B", "C"])),
            Arc::new(RecordingFetcher {
                calls: Mutex::new(Vec::new()),
            }),
        );

        let mut planned = None;
        let mut completed = Vec::new();
        ingestor
            .run_with_progress(|event| match event {
                ProgressEvent::Planned { total } => planned = Some(total),
                ProgressEvent::Completed { done, total, report } => {
                    completed.push((done, total, report.symbol.to_string()))
                }
            })
            .await
            .unwrap();

        assert_eq!(planned, Some(3));
        assert_eq!(
            completed,
            vec![
                (1, 3, "A".to_string()),
                (2, 3, "B".to_string()),
                (3, 3, "C".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_before_run_still_rebuilds_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("OLD_full.csv"), "Date,Close\n").unwrap();
        let ingestor = Ingestor::new(
            config(dir.path()),
            Arc::new(StaticSource::new(["A", "B"])),
            Arc::new(RecordingFetcher {
                calls: Mutex::new(Vec::new()),
            }),
        );
        ingestor.cancel_flag().cancel();

        let report = ingestor.run().await.unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.cancelled.len(), 2);
        assert_eq!(report.manifest_size, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("tickers.json")).unwrap(),
            r#"["OLD"]"#
        );
    }
}

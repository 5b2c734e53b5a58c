use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tickerstore_lib::{BatchReport, SeriesSummary, Symbol};

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    /// Unknown names fall back to a table.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            "markdown" | "md" => OutputFormat::Markdown,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
struct SeriesRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Rows")]
    #[serde(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "First")]
    #[serde(rename = "First")]
    first: String,
    #[tabled(rename = "Last")]
    #[serde(rename = "Last")]
    last: String,
}

#[derive(Tabled, Serialize)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct FailureRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Error")]
    #[serde(rename = "Error")]
    error: String,
}

/// Result of a single `fetch`.
#[derive(Debug, Serialize)]
pub struct FetchSummary {
    pub symbol: Symbol,
    pub rows: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
    pub path: PathBuf,
}

// -- Row builders --

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn build_series_rows(summaries: &[SeriesSummary]) -> Vec<SeriesRow> {
    summaries
        .iter()
        .map(|s| SeriesRow {
            symbol: s.symbol.to_string(),
            rows: s.rows,
            first: format_date(s.first),
            last: format_date(s.last),
        })
        .collect()
}

fn build_metric_rows(report: &BatchReport) -> Vec<MetricRow> {
    let mut rows = vec![
        MetricRow {
            metric: "Attempted",
            value: report.attempted.to_string(),
        },
        MetricRow {
            metric: "Written",
            value: report.written.to_string(),
        },
        MetricRow {
            metric: "No data",
            value: report.empty.len().to_string(),
        },
        MetricRow {
            metric: "Failed",
            value: report.failed().to_string(),
        },
        MetricRow {
            metric: "Skipped",
            value: report.skipped.len().to_string(),
        },
    ];
    if !report.cancelled.is_empty() {
        rows.push(MetricRow {
            metric: "Cancelled",
            value: report.cancelled.len().to_string(),
        });
    }
    rows.push(MetricRow {
        metric: "Manifest size",
        value: report.manifest_size.to_string(),
    });
    rows.push(MetricRow {
        metric: "Requests",
        value: report.requests.requests_made.to_string(),
    });
    if report.requests.retries > 0 {
        rows.push(MetricRow {
            metric: "Retries",
            value: format!(
                "{} ({:.1}s backoff)",
                report.requests.retries, report.requests.total_backoff_secs
            ),
        });
    }
    rows
}

fn build_failure_rows(report: &BatchReport) -> Vec<FailureRow> {
    report
        .failures
        .iter()
        .map(|f| FailureRow {
            symbol: f.symbol.to_string(),
            error: f.error.clone(),
        })
        .collect()
}

// -- Series listing --

pub fn print_series_table(summaries: &[SeriesSummary]) {
    println!("{}", Table::new(build_series_rows(summaries)));
}

pub fn print_series_markdown(summaries: &[SeriesSummary]) {
    let mut table = Table::new(build_series_rows(summaries));
    table.with(Style::markdown());
    println!("{}", table);
}

pub fn print_series_csv(summaries: &[SeriesSummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in build_series_rows(summaries) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// -- Batch report --

pub fn print_batch_report(report: &BatchReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in build_metric_rows(report) {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            let markdown = *format == OutputFormat::Markdown;
            let mut table = Table::new(build_metric_rows(report));
            if markdown {
                table.with(Style::markdown());
            }
            println!("{}", table);

            let failures = build_failure_rows(report);
            if !failures.is_empty() {
                let mut table = Table::new(failures);
                if markdown {
                    table.with(Style::markdown());
                }
                println!("\nFailed symbols:\n{}", table);
            }
        }
    }
    Ok(())
}

// -- Single fetch --

pub fn print_fetch_summary(summary: &FetchSummary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(summary),
        _ => eprintln!(
            "Wrote {} rows for {} ({} to {}) to {}",
            summary.rows,
            summary.symbol,
            format_date(summary.first),
            format_date(summary.last),
            summary.path.display()
        ),
    }
    Ok(())
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickerstore_lib::{FailedSymbol, TrackerSummary};

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    fn sample_report() -> BatchReport {
        BatchReport {
            attempted: 3,
            written: 1,
            empty: vec![sym("BRK-B")],
            skipped: vec![sym("ATVI")],
            failures: vec![FailedSymbol {
                symbol: sym("XYZ"),
                error: "Unknown symbol: No data found".to_string(),
            }],
            cancelled: Vec::new(),
            manifest_size: 1,
            requests: TrackerSummary {
                requests_made: 3,
                requests_succeeded: 2,
                requests_failed: 1,
                ..Default::default()
            },
        }
    }

    fn csv_from_rows<T: Serialize>(rows: &[T]) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in rows {
            wtr.serialize(row).unwrap();
        }
        wtr.flush().unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_name("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name("CSV"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_name("md"), OutputFormat::Markdown);
        assert_eq!(OutputFormat::from_name("whatever"), OutputFormat::Table);
    }

    #[test]
    fn test_build_series_rows_mapping() {
        let summaries = vec![SeriesSummary {
            symbol: sym("AAPL"),
            rows: 3,
            first: NaiveDate::from_ymd_opt(2024, 6, 3),
            last: NaiveDate::from_ymd_opt(2024, 6, 5),
        }];
        let rows = build_series_rows(&summaries);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].rows, 3);
        assert_eq!(rows[0].first, "2024-06-03");
        assert_eq!(rows[0].last, "2024-06-05");
    }

    #[test]
    fn test_build_series_rows_empty_file() {
        let summaries = vec![SeriesSummary {
            symbol: sym("NEW"),
            rows: 0,
            first: None,
            last: None,
        }];
        let rows = build_series_rows(&summaries);
        assert_eq!(rows[0].first, "-");
    }

    #[test]
    fn test_metric_rows_hide_zero_cancel_and_retries() {
        let rows = build_metric_rows(&sample_report());
        let metrics: Vec<&str> = rows.iter().map(|r| r.metric).collect();
        assert_eq!(
            metrics,
            vec![
                "Attempted",
                "Written",
                "No data",
                "Failed",
                "Skipped",
                "Manifest size",
                "Requests"
            ]
        );
        assert_eq!(rows[3].value, "1");
    }

    #[test]
    fn test_failure_rows() {
        let rows = build_failure_rows(&sample_report());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "XYZ");
    }

    #[test]
    fn test_csv_series_headers() {
        let csv = csv_from_rows(&build_series_rows(&[]));
        assert!(csv.is_empty());

        let rows = build_series_rows(&[SeriesSummary {
            symbol: sym("AAPL"),
            rows: 1,
            first: None,
            last: None,
        }]);
        let csv = csv_from_rows(&rows);
        assert_eq!(csv.lines().next().unwrap(), "Symbol,Rows,First,Last");
    }

    #[test]
    fn test_csv_metric_headers() {
        let csv = csv_from_rows(&build_metric_rows(&sample_report()));
        assert_eq!(csv.lines().next().unwrap(), "Metric,Value");
        assert!(csv.contains("Written,1"));
    }

    #[test]
    fn test_batch_report_json_shape() {
        let value = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(value["attempted"], 3);
        assert_eq!(value["empty"][0], "BRK-B");
        assert_eq!(value["failures"][0]["symbol"], "XYZ");
        assert_eq!(value["requests"]["requests_made"], 3);
    }
}

//! Per-symbol CSV persistence.
//!
//! One `<SYMBOL>_full.csv` per symbol with a `Date,Close` header. Files are
//! written to a temp name in the same directory and renamed into place.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::series::{PricePoint, PriceSeries};
use crate::symbol::Symbol;

/// Suffix that marks a persisted series file.
pub const SERIES_SUFFIX: &str = "_full.csv";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl WriteError {
    fn io(path: &Path, source: io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        WriteError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Close")]
    close: f64,
}

pub fn series_file_name(symbol: &Symbol) -> String {
    format!("{}{}", symbol, SERIES_SUFFIX)
}

pub fn series_path(dir: &Path, symbol: &Symbol) -> PathBuf {
    dir.join(series_file_name(symbol))
}

/// Symbol encoded in a series file name, if the name is one.
pub fn symbol_from_file_name(name: &str) -> Option<Symbol> {
    let stem = name.strip_suffix(SERIES_SUFFIX)?;
    let symbol = Symbol::parse(stem).ok()?;
    // only names we would have written ourselves
    (symbol.as_str() == stem).then_some(symbol)
}

/// Write `series` to `<dir>/<SYMBOL>_full.csv`, creating `dir` if needed.
pub fn write_series(dir: &Path, symbol: &Symbol, series: &PriceSeries) -> Result<PathBuf, WriteError> {
    fs::create_dir_all(dir).map_err(|e| WriteError::io(dir, e))?;
    let path = series_path(dir, symbol);
    write_series_to(&path, series)?;
    Ok(path)
}

/// Write `series` to an explicit path, atomically replacing any existing file.
pub fn write_series_to(path: &Path, series: &PriceSeries) -> Result<(), WriteError> {
    write_atomic(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        if series.is_empty() {
            writer
                .write_record(["Date", "Close"])
                .map_err(|e| WriteError::csv(path, e))?;
        }
        for point in series.iter() {
            writer
                .serialize(CsvRow {
                    date: point.date,
                    close: point.close,
                })
                .map_err(|e| WriteError::csv(path, e))?;
        }
        writer.flush().map_err(|e| WriteError::io(path, e))?;
        Ok(())
    })
}

/// Write through `fill` into a sibling temp file, then rename over `path`.
/// The temp file is removed if anything fails.
pub(crate) fn write_atomic<F>(path: &Path, fill: F) -> Result<(), WriteError>
where
    F: FnOnce(&mut fs::File) -> Result<(), WriteError>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.tmp-{}", name, std::process::id()));

    let result = (|| {
        let mut file = fs::File::create(&tmp).map_err(|e| WriteError::io(&tmp, e))?;
        fill(&mut file)?;
        file.sync_all().map_err(|e| WriteError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| WriteError::io(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Parse a series file back into memory.
pub fn read_series(path: &Path) -> Result<PriceSeries, WriteError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| WriteError::csv(path, e))?;
    let mut points = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| WriteError::csv(path, e))?;
        points.push(PricePoint::new(row.date, row.close));
    }
    Ok(PriceSeries::from_points(points))
}

/// Row count and date span of one persisted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub symbol: Symbol,
    pub rows: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}

pub fn summarize_series(dir: &Path, symbol: &Symbol) -> Result<SeriesSummary, WriteError> {
    let series = read_series(&series_path(dir, symbol))?;
    Ok(SeriesSummary {
        symbol: symbol.clone(),
        rows: series.len(),
        first: series.first_date(),
        last: series.last_date(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> PriceSeries {
        PriceSeries::from_points(vec![
            PricePoint::new(d(2024, 6, 3), 194.03),
            PricePoint::new(d(2024, 6, 4), 194.35),
            PricePoint::new(d(2024, 6, 5), 195.87),
        ])
    }

    #[test]
    fn file_name_uses_symbol() {
        let sym = Symbol::parse("brk.b").unwrap();
        assert_eq!(series_file_name(&sym), "BRK-B_full.csv");
    }

    #[test]
    fn symbol_from_file_name_accepts_only_series_files() {
        assert_eq!(
            symbol_from_file_name("AAPL_full.csv"),
            Some(Symbol::parse("AAPL").unwrap())
        );
        assert_eq!(symbol_from_file_name("tickers.json"), None);
        assert_eq!(symbol_from_file_name("AAPL.csv"), None);
        assert_eq!(symbol_from_file_name("_full.csv"), None);
        assert_eq!(symbol_from_file_name("aapl_full.csv"), None);
        assert_eq!(symbol_from_file_name(".AAPL_full.csv.tmp-1"), None);
    }

    #[test]
    fn write_produces_date_close_csv() {
        let dir = tempfile::tempdir().unwrap();
        let sym = Symbol::parse("AAPL").unwrap();
        let path = write_series(dir.path(), &sym, &sample()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Date,Close\n2024-06-03,194.03\n2024-06-04,194.35\n2024-06-05,195.87\n"
        );
    }

    #[test]
    fn write_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("public").join("data");
        let sym = Symbol::parse("MSFT").unwrap();
        let path = write_series(&nested, &sym, &sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let sym = Symbol::parse("AAPL").unwrap();
        let path = write_series(dir.path(), &sym, &sample()).unwrap();
        assert_eq!(read_series(&path).unwrap(), sample());
    }

    #[test]
    fn overwrite_replaces_content_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let sym = Symbol::parse("AAPL").unwrap();
        write_series(dir.path(), &sym, &sample()).unwrap();

        let shorter = PriceSeries::from_points(vec![PricePoint::new(d(2024, 1, 2), 1.5)]);
        let path = write_series(dir.path(), &sym, &shorter).unwrap();
        assert_eq!(read_series(&path).unwrap(), shorter);

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["AAPL_full.csv"]);
    }

    #[test]
    fn read_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BAD_full.csv");
        fs::write(&path, "Date,Close\nnot-a-date,abc\n").unwrap();
        assert!(matches!(read_series(&path), Err(WriteError::Csv { .. })));
    }

    #[test]
    fn summarize_reports_span() {
        let dir = tempfile::tempdir().unwrap();
        let sym = Symbol::parse("AAPL").unwrap();
        write_series(dir.path(), &sym, &sample()).unwrap();
        let summary = summarize_series(dir.path(), &sym).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.first, Some(d(2024, 6, 3)));
        assert_eq!(summary.last, Some(d(2024, 6, 5)));
    }
}

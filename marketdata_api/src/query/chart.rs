use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use url::Url;

use super::common::{Query, QueryCommon};

/// Relative lookback window understood by the chart endpoint (`range=` parameter).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Range {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
    YearToDate,
    Max,
}

impl Range {
    pub fn as_str(&self) -> &'static str {
        match self {
            Range::OneMonth => "1mo",
            Range::ThreeMonths => "3mo",
            Range::SixMonths => "6mo",
            Range::OneYear => "1y",
            Range::TwoYears => "2y",
            Range::FiveYears => "5y",
            Range::TenYears => "10y",
            Range::YearToDate => "ytd",
            Range::Max => "max",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Range {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1mo" => Ok(Range::OneMonth),
            "3mo" => Ok(Range::ThreeMonths),
            "6mo" => Ok(Range::SixMonths),
            "1y" => Ok(Range::OneYear),
            "2y" => Ok(Range::TwoYears),
            "5y" => Ok(Range::FiveYears),
            "10y" => Ok(Range::TenYears),
            "ytd" => Ok(Range::YearToDate),
            "max" => Ok(Range::Max),
            other => Err(format!(
                "unknown period '{}'. Valid periods: 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max",
                other
            )),
        }
    }
}

/// Which slice of history a chart query asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartSpan {
    /// Absolute dates. `end` is exclusive; `None` means "up to now".
    Between {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
    /// Lookback relative to today.
    Range(Range),
}

/// Query builder for `/v8/finance/chart/{symbol}`.
#[derive(Clone, Copy, Debug)]
pub struct ChartQuery {
    pub common: QueryCommon,
    pub span: ChartSpan,
}

impl ChartQuery {
    /// Daily bars from `start` (inclusive) to now.
    pub fn since(start: NaiveDate) -> Self {
        Self {
            common: QueryCommon::default(),
            span: ChartSpan::Between { start, end: None },
        }
    }

    /// Daily bars in `[start, end)`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            common: QueryCommon::default(),
            span: ChartSpan::Between {
                start,
                end: Some(end),
            },
        }
    }

    /// Daily bars over a relative lookback such as `5y`.
    pub fn range(range: Range) -> Self {
        Self {
            common: QueryCommon::default(),
            span: ChartSpan::Range(range),
        }
    }
}

impl Query for ChartQuery {
    fn get_common(&mut self) -> &mut QueryCommon {
        &mut self.common
    }

    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        match self.span {
            ChartSpan::Between { start, end } => {
                let period2 = end
                    .map(midnight_utc_timestamp)
                    .unwrap_or_else(|| Utc::now().timestamp());
                url.query_pairs_mut()
                    .append_pair("period1", &midnight_utc_timestamp(start).to_string())
                    .append_pair("period2", &period2.to_string());
            }
            ChartSpan::Range(range) => {
                url.query_pairs_mut().append_pair("range", range.as_str());
            }
        }
        self.common.add_to_url(&url)
    }
}

fn midnight_utc_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

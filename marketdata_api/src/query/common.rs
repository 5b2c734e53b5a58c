//! Shared query infrastructure: the [`Query`] trait, [`QueryCommon`] fields, and [`Interval`].

use std::fmt;
use std::str::FromStr;

use url::Url;

/// Trait implemented by all query builders. Provides URL serialization and
/// shared builder methods for bar interval and session filtering.
pub trait Query {
    /// Appends this query's parameters to the given URL, returning the modified URL.
    fn add_to_url(&self, url: &Url) -> Url;

    /// Returns a mutable reference to the common query fields.
    fn get_common(&mut self) -> &mut QueryCommon;

    /// Sets the bar interval.
    fn with_interval(mut self, interval: Interval) -> Self
    where
        Self: Sized,
    {
        self.get_common().interval = interval;
        self
    }

    /// Includes pre- and post-market bars (only meaningful for intraday intervals).
    fn with_pre_post(mut self, include_pre_post: bool) -> Self
    where
        Self: Sized,
    {
        self.get_common().include_pre_post = include_pre_post;
        self
    }
}

/// Bar size requested from the chart endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interval {
    /// One bar per trading day. This is the default.
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Interval::OneDay),
            "1wk" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            other => Err(format!(
                "unknown interval '{}'. Valid intervals: 1d, 1wk, 1mo",
                other
            )),
        }
    }
}

/// Fields shared by all query types.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCommon {
    /// Bar interval. Defaults to daily.
    pub interval: Interval,
    /// Include extended-hours bars. Defaults to false.
    pub include_pre_post: bool,
}

impl QueryCommon {
    /// Appends the interval and session parameters to the URL.
    pub fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("interval", self.interval.as_str())
            .append_pair(
                "includePrePost",
                if self.include_pre_post { "true" } else { "false" },
            );
        url
    }
}

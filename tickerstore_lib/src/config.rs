//! Run configuration.
//!
//! Layers, lowest to highest: built-in defaults, a TOML file, `TICKERSTORE_*`
//! environment variables, then whatever the caller (the CLI) overlays. Each
//! layer is a [`ConfigFile`] with every field optional; [`IngestConfig::from_layers`]
//! resolves the merged layer into a validated config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use marketdata_api::{Interval, Range};
use serde::Deserialize;
use thiserror::Error;

use crate::fetch::FetchWindow;
use crate::rate_limiter::{DelayStrategy, RetryPolicy};
use crate::scrape::DEFAULT_MEMBERSHIP_URL;

pub const DEFAULT_CONFIG_FILE: &str = "tickerstore.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "public/data";
pub const DEFAULT_DELAY_MS: u64 = 500;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One configuration layer. Unset fields fall through to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub output_dir: Option<PathBuf>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub period: Option<String>,
    pub interval: Option<String>,
    pub delay_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_base_ms: Option<u64>,
    pub retry_max_ms: Option<u64>,
    pub chart_base_url: Option<String>,
    pub membership_url: Option<String>,
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|value| {
        value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        })
    })
    .transpose()
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given (it must exist), else `./tickerstore.toml` if
    /// present, else an empty layer.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    tracing::debug!("Using config file {}", default.display());
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Layer from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Layer from an arbitrary variable lookup (tests pass a map).
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            output_dir: get("TICKERSTORE_OUTPUT_DIR").map(PathBuf::from),
            start_date: get("TICKERSTORE_START_DATE"),
            end_date: get("TICKERSTORE_END_DATE"),
            period: get("TICKERSTORE_PERIOD"),
            interval: get("TICKERSTORE_INTERVAL"),
            delay_ms: parse_env("TICKERSTORE_DELAY_MS", get("TICKERSTORE_DELAY_MS"))?,
            jitter_ms: parse_env("TICKERSTORE_JITTER_MS", get("TICKERSTORE_JITTER_MS"))?,
            concurrency: parse_env("TICKERSTORE_CONCURRENCY", get("TICKERSTORE_CONCURRENCY"))?,
            max_retries: parse_env("TICKERSTORE_MAX_RETRIES", get("TICKERSTORE_MAX_RETRIES"))?,
            retry_base_ms: parse_env("TICKERSTORE_RETRY_BASE_MS", get("TICKERSTORE_RETRY_BASE_MS"))?,
            retry_max_ms: parse_env("TICKERSTORE_RETRY_MAX_MS", get("TICKERSTORE_RETRY_MAX_MS"))?,
            chart_base_url: get("TICKERSTORE_CHART_BASE_URL"),
            membership_url: get("TICKERSTORE_MEMBERSHIP_URL"),
        })
    }

    /// Overlay `higher` on `self`; set fields in `higher` win.
    pub fn merge(self, higher: ConfigFile) -> ConfigFile {
        ConfigFile {
            output_dir: higher.output_dir.or(self.output_dir),
            start_date: higher.start_date.or(self.start_date),
            end_date: higher.end_date.or(self.end_date),
            period: higher.period.or(self.period),
            interval: higher.interval.or(self.interval),
            delay_ms: higher.delay_ms.or(self.delay_ms),
            jitter_ms: higher.jitter_ms.or(self.jitter_ms),
            concurrency: higher.concurrency.or(self.concurrency),
            max_retries: higher.max_retries.or(self.max_retries),
            retry_base_ms: higher.retry_base_ms.or(self.retry_base_ms),
            retry_max_ms: higher.retry_max_ms.or(self.retry_max_ms),
            chart_base_url: higher.chart_base_url.or(self.chart_base_url),
            membership_url: higher.membership_url.or(self.membership_url),
        }
    }
}

/// Resolved settings for one run. Passed explicitly; nothing reads globals.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub output_dir: PathBuf,
    pub window: FetchWindow,
    pub delay: DelayStrategy,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// `None` uses the production chart endpoint.
    pub chart_base_url: Option<String>,
    pub membership_url: String,
}

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or_default()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            window: FetchWindow::since(default_start_date()),
            delay: DelayStrategy::Fixed(Duration::from_millis(DEFAULT_DELAY_MS)),
            concurrency: 1,
            retry: RetryPolicy::default(),
            chart_base_url: None,
            membership_url: DEFAULT_MEMBERSHIP_URL.to_string(),
        }
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl IngestConfig {
    /// Resolve a merged layer against the defaults and validate it.
    ///
    /// A `period` takes precedence over `start_date`/`end_date`.
    pub fn from_layers(layer: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = IngestConfig::default();

        let interval = match &layer.interval {
            Some(raw) => raw.parse::<Interval>().map_err(|_| ConfigError::InvalidValue {
                key: "interval".to_string(),
                value: raw.clone(),
            })?,
            None => Interval::default(),
        };

        let window = match &layer.period {
            Some(raw) => {
                let range = raw.parse::<Range>().map_err(|_| ConfigError::InvalidValue {
                    key: "period".to_string(),
                    value: raw.clone(),
                })?;
                FetchWindow::period(range)
            }
            None => {
                let start = match &layer.start_date {
                    Some(raw) => parse_date("start_date", raw)?,
                    None => default_start_date(),
                };
                match &layer.end_date {
                    Some(raw) => {
                        let end = parse_date("end_date", raw)?;
                        if start >= end {
                            return Err(ConfigError::Invalid(format!(
                                "start date {} must be before end date {}",
                                start, end
                            )));
                        }
                        FetchWindow::between(start, end)
                    }
                    None => FetchWindow::since(start),
                }
            }
        }
        .with_interval(interval);

        let concurrency = layer.concurrency.unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".to_string()));
        }

        let delay = DelayStrategy::from_millis(
            layer.delay_ms.unwrap_or(DEFAULT_DELAY_MS),
            layer.jitter_ms.unwrap_or(0),
        );

        let retry = RetryPolicy {
            max_retries: layer.max_retries.unwrap_or(defaults.retry.max_retries),
            base_delay: layer
                .retry_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
            max_delay: layer
                .retry_max_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.max_delay),
        };
        if retry.base_delay > retry.max_delay {
            return Err(ConfigError::Invalid(
                "retry base delay exceeds retry max delay".to_string(),
            ));
        }

        Ok(Self {
            output_dir: layer.output_dir.clone().unwrap_or(defaults.output_dir),
            window,
            delay,
            concurrency,
            retry,
            chart_base_url: layer.chart_base_url.clone(),
            membership_url: layer
                .membership_url
                .clone()
                .unwrap_or(defaults.membership_url),
        })
    }
}

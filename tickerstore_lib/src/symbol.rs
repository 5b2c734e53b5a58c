//! Ticker symbols and the provider naming convention.
//!
//! Membership tables write share classes with a dot (`BRK.B`); the chart
//! provider expects a dash (`BRK-B`). [`Symbol`] always holds the provider form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest symbol accepted. Real tickers are far shorter.
pub const MAX_SYMBOL_LENGTH: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,
    #[error("symbol '{0}' exceeds 16 characters")]
    TooLong(String),
    #[error("symbol '{symbol}' contains invalid character '{ch}'")]
    InvalidChar { symbol: String, ch: char },
}

/// A normalized, non-empty ticker symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

/// Trim, uppercase, and replace `.` with `-`.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase().replace('.', "-")
}

impl Symbol {
    /// Normalizes `raw` and validates the result.
    pub fn parse(raw: &str) -> Result<Self, SymbolError> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(SymbolError::Empty);
        }
        if normalized.chars().count() > MAX_SYMBOL_LENGTH {
            return Err(SymbolError::TooLong(normalized));
        }
        if let Some(ch) = normalized
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '-' | '^' | '=')))
        {
            return Err(SymbolError::InvalidChar {
                symbol: normalized,
                ch,
            });
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

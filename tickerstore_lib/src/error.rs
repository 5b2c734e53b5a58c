//! Error types for the library layer.

use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::ManifestError;

/// Run-level errors. Anything that reaches this type aborts the batch;
/// per-symbol problems are reported through [`crate::SymbolOutcome`] instead.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The ticker list could not be produced, so there is nothing to fetch.
    #[error("Symbol source unavailable: {0}")]
    SourceUnavailable(String),
    /// A symbol supplied directly by the caller failed validation.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The manifest could not be rebuilt after the batch settled.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

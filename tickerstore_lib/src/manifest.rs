//! The `tickers.json` manifest.
//!
//! The manifest is derived from the output directory on every rebuild and is
//! never merged with a previous copy, so it cannot drift from the files.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{symbol_from_file_name, write_atomic, WriteError};
use crate::symbol::Symbol;

pub const MANIFEST_FILE: &str = "tickers.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write manifest: {0}")]
    Write(#[from] WriteError),
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sorted, duplicate-free set of persisted symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeSet<Symbol>);

impl Manifest {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter()
    }

    /// Compact JSON array, e.g. `["AAPL","TSLA"]`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromIterator<Symbol> for Manifest {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Manifest(iter.into_iter().collect())
    }
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

/// Scan `dir` for series files. A missing directory yields an empty manifest.
pub fn build_manifest(dir: &Path) -> Result<Manifest, ManifestError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Manifest::default()),
        Err(source) => {
            return Err(ManifestError::Scan {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut symbols = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| ManifestError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(symbol) = symbol_from_file_name(name) {
            symbols.insert(symbol);
        }
    }
    Ok(Manifest(symbols))
}

/// Write the manifest to `<dir>/tickers.json` atomically.
pub fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<PathBuf, ManifestError> {
    fs::create_dir_all(dir).map_err(|source| ManifestError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;
    let json = manifest.to_json()?;
    let path = manifest_path(dir);
    write_atomic(&path, |file| {
        file.write_all(json.as_bytes())
            .map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })
    })?;
    Ok(path)
}

pub fn read_manifest(dir: &Path) -> Result<Manifest, ManifestError> {
    let path = manifest_path(dir);
    let content = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Scan then write; returns the manifest that was written.
pub fn rebuild_manifest(dir: &Path) -> Result<Manifest, ManifestError> {
    let manifest = build_manifest(dir)?;
    let path = write_manifest(dir, &manifest)?;
    tracing::info!("Wrote {} symbols to {}", manifest.len(), path.display());
    Ok(manifest)
}

//! Symbol alias resolution.
//!
//! Maps symbols the membership table still lists to the name the chart
//! provider knows them by, handling renames that normalization alone cannot.
//! A `None` target marks a symbol with no successor; it is skipped.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::symbol::Symbol;

#[derive(Error, Debug)]
pub enum AliasError {
    #[error("Failed to parse symbol alias YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Duplicate 'from' symbol in alias file: {0}")]
    DuplicateFrom(String),
    #[error("Invalid symbol in alias file: {0}")]
    InvalidSymbol(String),
    #[error("Failed to read alias file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Deserialize, Debug)]
struct AliasFile {
    aliases: Vec<AliasEntry>,
}

#[derive(Deserialize, Debug)]
struct AliasEntry {
    from: String,
    to: Option<String>,
}

/// What to do with a symbol after alias lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Fetch under this symbol (possibly unchanged).
    Fetch(Symbol),
    /// Known to have no data; skip without a request.
    Retired,
}

/// Normalized `from -> to` alias table.
#[derive(Debug, Clone, Default)]
pub struct SymbolAliases {
    map: HashMap<Symbol, Option<Symbol>>,
}

impl SymbolAliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Look up one symbol. Aliases are applied once, not chased.
    pub fn resolve(&self, symbol: &Symbol) -> Resolution {
        match self.map.get(symbol) {
            Some(Some(target)) => Resolution::Fetch(target.clone()),
            Some(None) => Resolution::Retired,
            None => Resolution::Fetch(symbol.clone()),
        }
    }

    /// Overlay `other` on top of `self`; entries in `other` win.
    pub fn extend(&mut self, other: SymbolAliases) {
        self.map.extend(other.map);
    }
}

/// Parse symbol aliases from YAML content.
///
/// Both sides are normalized, so `BRK.B` and `BRK-B` name the same entry.
pub fn parse_symbol_aliases(yaml_content: &str) -> Result<SymbolAliases, AliasError> {
    let file: AliasFile = serde_yml::from_str(yaml_content)?;

    let mut map = HashMap::new();
    for entry in file.aliases {
        let from =
            Symbol::parse(&entry.from).map_err(|e| AliasError::InvalidSymbol(e.to_string()))?;
        let to = entry
            .to
            .map(|raw| Symbol::parse(&raw).map_err(|e| AliasError::InvalidSymbol(e.to_string())))
            .transpose()?;
        if map.contains_key(&from) {
            return Err(AliasError::DuplicateFrom(from.to_string()));
        }
        map.insert(from, to);
    }

    Ok(SymbolAliases { map })
}

/// Load the alias table embedded at compile time.
pub fn load_symbol_aliases() -> Result<SymbolAliases, AliasError> {
    let yaml_content = include_str!("../../seed_data/symbol_aliases.yml");
    parse_symbol_aliases(yaml_content)
}

/// Load an alias file from disk.
pub fn read_symbol_aliases(path: &std::path::Path) -> Result<SymbolAliases, AliasError> {
    let yaml_content = std::fs::read_to_string(path).map_err(|source| AliasError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_symbol_aliases(&yaml_content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid_aliases() {
        let yaml = r#"
aliases:
  - from: "FB"
    to: "META"
  - from: "flt"
    to: "cpay"
"#;
        let aliases = parse_symbol_aliases(yaml).unwrap();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases.resolve(&sym("FB")), Resolution::Fetch(sym("META")));
        assert_eq!(aliases.resolve(&sym("FLT")), Resolution::Fetch(sym("CPAY")));
    }

    #[test]
    fn test_null_to_marks_retired() {
        let yaml = r#"
aliases:
  - from: "ATVI"
    to: ~
"#;
        let aliases = parse_symbol_aliases(yaml).unwrap();
        assert_eq!(aliases.resolve(&sym("ATVI")), Resolution::Retired);
    }

    #[test]
    fn test_unknown_symbol_passes_through() {
        let aliases = SymbolAliases::new();
        assert_eq!(aliases.resolve(&sym("AAPL")), Resolution::Fetch(sym("AAPL")));
    }

    #[test]
    fn test_from_is_normalized() {
        let yaml = r#"
aliases:
  - from: "BRK.A"
    to: "BRK-B"
"#;
        let aliases = parse_symbol_aliases(yaml).unwrap();
        assert_eq!(aliases.resolve(&sym("BRK-A")), Resolution::Fetch(sym("BRK-B")));
    }

    #[test]
    fn test_duplicate_from_rejected() {
        let yaml = r#"
aliases:
  - from: "BRK.B"
    to: "BRK-A"
  - from: "brk-b"
    to: "BRK-A"
"#;
        let result = parse_symbol_aliases(yaml);
        assert!(matches!(result.unwrap_err(), AliasError::DuplicateFrom(_)));
    }

    #[test]
    fn test_invalid_symbol_rejected() {
        let yaml = r#"
aliases:
  - from: "A B"
    to: "AB"
"#;
        assert!(matches!(
            parse_symbol_aliases(yaml).unwrap_err(),
            AliasError::InvalidSymbol(_)
        ));
    }

    #[test]
    fn test_empty_aliases() {
        let aliases = parse_symbol_aliases("aliases: []\n").unwrap();
        assert!(aliases.is_empty());
    }

    #[test]
    fn test_extend_overrides() {
        let mut base = parse_symbol_aliases("aliases:\n  - from: FB\n    to: META\n").unwrap();
        let overlay = parse_symbol_aliases("aliases:\n  - from: FB\n    to: ~\n").unwrap();
        base.extend(overlay);
        assert_eq!(base.resolve(&sym("FB")), Resolution::Retired);
    }

    #[test]
    fn test_load_symbol_aliases_succeeds() {
        let aliases = load_symbol_aliases().unwrap();
        assert!(!aliases.is_empty());
    }

    #[test]
    fn test_read_symbol_aliases_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yml");
        let err = read_symbol_aliases(&path).unwrap_err();
        assert!(matches!(err, AliasError::Io { ref path, .. } if path.ends_with("missing.yml")));
    }

    #[test]
    fn test_read_symbol_aliases_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.yml");
        std::fs::write(&path, "aliases:\n  - from: twtr\n    to: ~\n").unwrap();
        let aliases = read_symbol_aliases(&path).unwrap();
        assert_eq!(aliases.resolve(&sym("TWTR")), Resolution::Retired);
    }
}

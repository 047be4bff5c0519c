use std::path::Path;

use serde::{Deserialize, Serialize};

use schemata_core::{Error, ObjectType, Result};

use crate::dialect::IdentifierQuoting;

/// Options that control how an inspection run behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectOptions {
    /// Kinds inspected when a call names none.
    pub object_types: Vec<ObjectType>,
    /// Table types requested from the driver; empty means all.
    pub table_types: Vec<String>,
    /// Keep objects in the product's own system schemas.
    pub include_system_schemas: bool,
    /// Overrides the dialect-reported statement budget; `0` or absent defers
    /// to the dialect.
    pub max_open_cursors: Option<usize>,
    /// Route statements through the run's statement budget and reuse them
    /// per query text. When off, every query prepares and closes its own.
    pub managed_statements: bool,
    /// How identifiers read from result rows are folded and quoted.
    pub identifier_quoting: IdentifierQuoting,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            object_types: ObjectType::ALL.to_vec(),
            table_types: Vec::new(),
            include_system_schemas: false,
            max_open_cursors: None,
            managed_statements: true,
            identifier_quoting: IdentifierQuoting::default(),
        }
    }
}

impl InspectOptions {
    /// Parse options from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| Error::Config(err.to_string()))
    }

    /// Read and parse the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("reading {}: {err}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Render the options as a TOML document.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| Error::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let options = InspectOptions::from_toml_str("").unwrap();
        assert_eq!(options, InspectOptions::default());
        assert_eq!(options.object_types.len(), ObjectType::ALL.len());
    }

    #[test]
    fn parses_partial_document() {
        let options = InspectOptions::from_toml_str(
            r#"
            object_types = ["table", "column", "foreign_key"]
            table_types = ["TABLE"]
            max_open_cursors = 16
            identifier_quoting = "always"
            "#,
        )
        .unwrap();
        assert_eq!(
            options.object_types,
            vec![ObjectType::Table, ObjectType::Column, ObjectType::ForeignKey]
        );
        assert_eq!(options.max_open_cursors, Some(16));
        assert_eq!(options.identifier_quoting, IdentifierQuoting::Always);
        assert!(options.managed_statements);
    }

    #[test]
    fn zero_budget_is_kept_as_written() {
        let options = InspectOptions::from_toml_str("max_open_cursors = 0").unwrap();
        assert_eq!(options.max_open_cursors, Some(0));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = InspectOptions::from_toml_str(r#"object_types = ["tablespace"]"#).unwrap_err();
        assert!(err.to_string().starts_with("configuration error"));
    }

    #[test]
    fn round_trips_through_toml() {
        let options = InspectOptions {
            include_system_schemas: true,
            ..InspectOptions::default()
        };
        let text = options.to_toml_string().unwrap();
        assert_eq!(InspectOptions::from_toml_str(&text).unwrap(), options);
    }
}

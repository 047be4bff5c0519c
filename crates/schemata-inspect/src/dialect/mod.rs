//! SQL dialects: identifier rules, type aliasing and capability queries.
//!
//! A dialect is resolved once per run from the live [`DatabaseInfo`]. The
//! engine only uses the small surface defined by [`Dialect`]; statement
//! generation for DDL or DML lives elsewhere.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use schemata_core::{DatabaseInfo, Identifier, Result};

use crate::connection::Connection;
use crate::registry::ProductRegistry;

/// How names read from the database become [`Identifier`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierQuoting {
    /// Only names that would not survive unquoted are case-sensitive.
    #[default]
    Minimal,
    /// Every name is case-sensitive.
    Always,
}

/// Case an unquoted identifier folds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierCase {
    Upper,
    Lower,
    /// Names keep their case and compare without it.
    Preserve,
}

#[async_trait]
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Upper
    }

    /// Build the identifier for a name as stored in the system catalogs.
    fn identifier(&self, name: &str, quoting: IdentifierQuoting) -> Identifier {
        let case_sensitive = match quoting {
            IdentifierQuoting::Always => true,
            IdentifierQuoting::Minimal => {
                !is_regular_identifier(name) || !is_folded(name, self.identifier_case())
            }
        };
        Identifier::new(name, case_sensitive)
    }

    fn quote(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Positional parameter marker, `index` starting at 1.
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Type code to record for a column the driver reported as
    /// `(type_code, type_name)`.
    fn jdbc_type_alias(&self, type_code: i32, _type_name: &str) -> i32 {
        type_code
    }

    fn is_system_schema(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("INFORMATION_SCHEMA")
    }

    /// Concurrent open statement limit of the server; `0` means unlimited.
    async fn max_open_cursors(&self, _connection: &mut dyn Connection) -> Result<usize> {
        Ok(0)
    }
}

/// Whether `name` is valid without quotes: a letter or `_` followed by
/// letters, digits, `_` or `$`.
pub fn is_regular_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '$')
}

fn is_folded(name: &str, case: IdentifierCase) -> bool {
    match case {
        IdentifierCase::Upper => !name.chars().any(char::is_lowercase),
        IdentifierCase::Lower => !name.chars().any(char::is_uppercase),
        IdentifierCase::Preserve => true,
    }
}

/// Dialect used when no product-specific one is registered.
#[derive(Debug, Clone, Default)]
pub struct GenericDialect;

impl Dialect for GenericDialect {
    fn name(&self) -> &'static str {
        "generic"
    }
}

/// Maps database products to dialects.
#[derive(Debug, Clone)]
pub struct DialectResolver {
    registry: ProductRegistry<Arc<dyn Dialect>>,
}

impl DialectResolver {
    /// Resolver knowing only the generic dialect.
    pub fn new() -> Self {
        let mut registry: ProductRegistry<Arc<dyn Dialect>> = ProductRegistry::new();
        registry.set_fallback(Arc::new(GenericDialect));
        Self { registry }
    }

    /// Resolver with every built-in product dialect registered.
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        resolver.register(
            DatabaseInfo::new("PostgreSQL"),
            Arc::new(crate::postgres::PostgresDialect),
        );
        resolver.register(DatabaseInfo::new("MySQL"), Arc::new(crate::mysql::MySqlDialect));
        resolver.register(DatabaseInfo::new("MariaDB"), Arc::new(crate::mysql::MySqlDialect));
        resolver.register(
            DatabaseInfo::new("Microsoft SQL Server"),
            Arc::new(crate::mssql::MssqlDialect),
        );
        resolver.register(DatabaseInfo::new("Oracle"), Arc::new(crate::oracle::OracleDialect));
        resolver.register(DatabaseInfo::new("DB2"), Arc::new(crate::db2::Db2Dialect));
        resolver
    }

    /// Use `dialect` for `product` and later versions.
    pub fn register(&mut self, product: DatabaseInfo, dialect: Arc<dyn Dialect>) {
        debug!(product = %product, dialect = dialect.name(), "registering dialect");
        self.registry.register(product, dialect);
    }

    /// Most specific dialect for `info`, or the generic one.
    pub fn resolve(&self, info: &DatabaseInfo) -> Arc<dyn Dialect> {
        match self.registry.resolve(info) {
            Some(dialect) => Arc::clone(dialect),
            None => Arc::new(GenericDialect),
        }
    }
}

impl Default for DialectResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_folding_marks_lowercase_names_case_sensitive() {
        let dialect = GenericDialect;
        assert!(!dialect.identifier("ORDERS", IdentifierQuoting::Minimal).is_case_sensitive());
        assert!(dialect.identifier("orders", IdentifierQuoting::Minimal).is_case_sensitive());
        assert!(dialect.identifier("ORDER LINES", IdentifierQuoting::Minimal).is_case_sensitive());
        assert!(dialect.identifier("ORDERS", IdentifierQuoting::Always).is_case_sensitive());
    }

    #[test]
    fn regular_identifiers() {
        assert!(is_regular_identifier("order_lines$1"));
        assert!(is_regular_identifier("_tmp"));
        assert!(!is_regular_identifier("1st"));
        assert!(!is_regular_identifier("order-lines"));
        assert!(!is_regular_identifier(""));
    }

    #[test]
    fn quote_doubles_embedded_quotes() {
        assert_eq!(GenericDialect.quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn resolves_products_by_prefix() {
        let resolver = DialectResolver::with_defaults();
        let db2 = DatabaseInfo::new("DB2/LINUXX8664").with_version(11, 5);
        assert_eq!(resolver.resolve(&db2).name(), "db2");
        assert_eq!(resolver.resolve(&DatabaseInfo::new("PostgreSQL")).name(), "postgres");
        assert_eq!(resolver.resolve(&DatabaseInfo::new("Apache Derby")).name(), "generic");
    }
}

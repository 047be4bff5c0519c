//! PostgreSQL: the sqlx-backed [`Connection`](crate::Connection), the
//! dialect, and inspectors for what the catalog exposes beyond driver
//! metadata.

use schemata_core::{DatabaseInfo, type_codes};

use crate::dialect::{Dialect, IdentifierCase};
use crate::inspector::query_inspector;
use crate::manager::InspectionManager;

mod connection;
mod metadata;
mod queries;

pub use connection::PostgresConnection;
pub use queries::{
    PgAutoIncrementQuery, PgCheckQuery, PgSequenceQuery, PgTriggerQuery, PgUserDefinedTypeQuery,
};

pub const PRODUCT_NAME: &str = "PostgreSQL";

#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Lower
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn jdbc_type_alias(&self, type_code: i32, type_name: &str) -> i32 {
        match (type_code, type_name) {
            (type_codes::BIT, "bool") => type_codes::BOOLEAN,
            (type_codes::VARCHAR, "text") => type_codes::LONGVARCHAR,
            (type_codes::BINARY, "bytea") => type_codes::LONGVARBINARY,
            _ => type_code,
        }
    }

    fn is_system_schema(&self, name: &str) -> bool {
        name.starts_with("pg_") || name.eq_ignore_ascii_case("information_schema")
    }
}

/// Install the PostgreSQL inspectors.
pub fn register(manager: &mut InspectionManager) {
    let product = DatabaseInfo::new(PRODUCT_NAME);
    manager.register(product.clone(), query_inspector(PgUserDefinedTypeQuery));
    manager.register(product.clone().with_major(10), query_inspector(PgSequenceQuery));
    manager.register(product.clone().with_major(10), query_inspector(PgAutoIncrementQuery));
    manager.register(product.clone(), query_inspector(PgCheckQuery));
    manager.register(product, query_inspector(PgTriggerQuery));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::IdentifierQuoting;

    #[test]
    fn lower_case_names_fold() {
        let dialect = PostgresDialect;
        let orders = dialect.identifier("orders", IdentifierQuoting::Minimal);
        let mixed = dialect.identifier("OrderLines", IdentifierQuoting::Minimal);
        assert!(!orders.is_case_sensitive());
        assert!(mixed.is_case_sensitive());
    }

    #[test]
    fn system_schemas() {
        let dialect = PostgresDialect;
        assert!(dialect.is_system_schema("pg_catalog"));
        assert!(dialect.is_system_schema("pg_toast"));
        assert!(dialect.is_system_schema("information_schema"));
        assert!(!dialect.is_system_schema("public"));
    }

    #[test]
    fn booleans_report_as_boolean() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.jdbc_type_alias(type_codes::BIT, "bool"), type_codes::BOOLEAN);
        assert_eq!(dialect.jdbc_type_alias(type_codes::OTHER, "jsonb"), type_codes::OTHER);
    }
}

//! MySQL and MariaDB. Databases are catalogs: rows carry the database in
//! `TABLE_CAT` and leave `TABLE_SCHEM` empty.

use std::sync::Arc;

use schemata_core::{DatabaseInfo, ObjectType, Result, type_codes};

use crate::connection::Row;
use crate::context::InspectionContext;
use crate::dialect::{Dialect, IdentifierCase};
use crate::generic::{merge_auto_increment, merge_check, merge_trigger};
use crate::inspector::{InspectionQuery, Query, Source, UnsupportedInspector, query_inspector};
use crate::manager::InspectionManager;
use crate::scope::InspectionScope;

#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Preserve
    }

    fn quote(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn jdbc_type_alias(&self, type_code: i32, type_name: &str) -> i32 {
        if type_code == type_codes::BIT
            && (type_name.eq_ignore_ascii_case("BOOL") || type_name.eq_ignore_ascii_case("BOOLEAN"))
        {
            type_codes::BOOLEAN
        } else {
            type_code
        }
    }

    fn is_system_schema(&self, name: &str) -> bool {
        ["information_schema", "mysql", "performance_schema", "sys"]
            .iter()
            .any(|system| name.eq_ignore_ascii_case(system))
    }
}

/// Table-level queries need the database and the table.
fn table_scope(scope: &InspectionScope) -> bool {
    scope.catalog.is_some() && scope.table.is_some()
}

/// `base` restricted to the scope's database and table.
fn table_filtered(
    context: &InspectionContext<'_>,
    base: &str,
    scope: &InspectionScope,
    schema_column: &str,
    table_column: &str,
    order: &str,
) -> Query {
    Query::filtered(
        context.dialect(),
        base,
        &[
            (schema_column, scope.catalog.as_deref()),
            (table_column, scope.table.as_deref()),
        ],
        order,
    )
}

const AUTO_INCREMENT: &str = "SELECT c.TABLE_SCHEMA AS TABLE_CAT, \
     NULL AS TABLE_SCHEM, \
     c.TABLE_NAME AS TABLE_NAME, \
     c.COLUMN_NAME AS COLUMN_NAME, \
     @@auto_increment_offset AS START_WITH, \
     @@auto_increment_increment AS INCREMENT_BY, \
     t.AUTO_INCREMENT - 1 AS LAST_VALUE \
     FROM information_schema.COLUMNS c \
     JOIN information_schema.TABLES t \
     ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME \
     WHERE c.EXTRA LIKE '%auto_increment%'";

/// `AUTO_INCREMENT` columns with the table's counter.
#[derive(Debug, Clone, Default)]
pub struct MySqlAutoIncrementQuery;

impl InspectionQuery for MySqlAutoIncrementQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::AutoIncrement
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        Some(ObjectType::Table)
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        table_scope(scope)
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(
            context,
            AUTO_INCREMENT,
            scope,
            "c.TABLE_SCHEMA",
            "c.TABLE_NAME",
            "ORDER BY c.ORDINAL_POSITION",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_auto_increment(context, row)
    }
}

const ON_UPDATE: &str = "SELECT TABLE_SCHEMA AS TABLE_CAT, \
     NULL AS TABLE_SCHEM, \
     TABLE_NAME AS TABLE_NAME, \
     COLUMN_NAME AS COLUMN_NAME, \
     'ON UPDATE' AS TRIGGER_NAME, \
     'BEFORE' AS TRIGGER_TIMING, \
     'UPDATE' AS TRIGGER_EVENT, \
     'ROW' AS TRIGGER_LEVEL, \
     EXTRA AS TRIGGER_BODY \
     FROM information_schema.COLUMNS \
     WHERE EXTRA LIKE '%on update%'";

/// `ON UPDATE CURRENT_TIMESTAMP` columns, which behave as column triggers.
#[derive(Debug, Clone, Default)]
pub struct MySqlColumnTriggerQuery;

impl InspectionQuery for MySqlColumnTriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::ColumnTrigger
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        Some(ObjectType::Table)
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        table_scope(scope)
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(
            context,
            ON_UPDATE,
            scope,
            "TABLE_SCHEMA",
            "TABLE_NAME",
            "ORDER BY ORDINAL_POSITION",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_trigger(context, row)
    }
}

const TRIGGERS: &str = "SELECT EVENT_OBJECT_SCHEMA AS TABLE_CAT, \
     NULL AS TABLE_SCHEM, \
     EVENT_OBJECT_TABLE AS TABLE_NAME, \
     TRIGGER_NAME AS TRIGGER_NAME, \
     ACTION_TIMING AS TRIGGER_TIMING, \
     EVENT_MANIPULATION AS TRIGGER_EVENT, \
     ACTION_ORIENTATION AS TRIGGER_LEVEL, \
     ACTION_STATEMENT AS TRIGGER_BODY \
     FROM information_schema.TRIGGERS \
     WHERE 1 = 1";

#[derive(Debug, Clone, Default)]
pub struct MySqlTriggerQuery;

impl InspectionQuery for MySqlTriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Trigger
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        table_scope(scope)
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(
            context,
            TRIGGERS,
            scope,
            "EVENT_OBJECT_SCHEMA",
            "EVENT_OBJECT_TABLE",
            "ORDER BY ACTION_ORDER",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_trigger(context, row)
    }
}

const CHECKS: &str = "SELECT tc.TABLE_SCHEMA AS TABLE_CAT, \
     NULL AS TABLE_SCHEM, \
     tc.TABLE_NAME AS TABLE_NAME, \
     tc.CONSTRAINT_NAME AS CHECK_NAME, \
     cc.CHECK_CLAUSE AS CHECK_TEXT \
     FROM information_schema.TABLE_CONSTRAINTS tc \
     JOIN information_schema.CHECK_CONSTRAINTS cc \
     ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA \
     AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME \
     WHERE tc.CONSTRAINT_TYPE = 'CHECK'";

/// Check constraints, enforced from MySQL 8.0.16 and MariaDB 10.2.
#[derive(Debug, Clone, Default)]
pub struct MySqlCheckQuery;

impl InspectionQuery for MySqlCheckQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Check
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        table_scope(scope)
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(
            context,
            CHECKS,
            scope,
            "tc.TABLE_SCHEMA",
            "tc.TABLE_NAME",
            "ORDER BY tc.CONSTRAINT_NAME",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_check(context, row)
    }
}

/// Install the MySQL and MariaDB inspectors.
pub fn register(manager: &mut InspectionManager) {
    for product in ["MySQL", "MariaDB"] {
        let info = DatabaseInfo::new(product);
        manager.register(info.clone(), query_inspector(MySqlAutoIncrementQuery));
        manager.register(info.clone(), query_inspector(MySqlColumnTriggerQuery));
        manager.register(info.clone(), query_inspector(MySqlTriggerQuery));
        manager.register(info.clone(), Arc::new(UnsupportedInspector(ObjectType::Check)));
        manager.register(info, Arc::new(UnsupportedInspector(ObjectType::Sequence)));
    }
    manager.register(
        DatabaseInfo::new("MySQL").with_version(8, 0),
        query_inspector(MySqlCheckQuery),
    );
    manager.register(
        DatabaseInfo::new("MariaDB").with_version(10, 2),
        query_inspector(MySqlCheckQuery),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtick_quoting() {
        assert_eq!(MySqlDialect.quote("order`s"), "`order``s`");
    }

    #[test]
    fn table_queries_need_database_and_table() {
        let scope = InspectionScope::all().with_catalog("shop").with_table("orders");
        assert!(table_scope(&scope));
        assert!(!table_scope(&InspectionScope::all().with_table("orders")));
        assert!(!table_scope(&InspectionScope::all().with_schema("shop").with_table("orders")));
    }

    #[test]
    fn system_databases() {
        assert!(MySqlDialect.is_system_schema("PERFORMANCE_SCHEMA"));
        assert!(!MySqlDialect.is_system_schema("shop"));
    }
}

//! Microsoft SQL Server, read from the `sys` catalog views.

use std::sync::Arc;

use schemata_core::{DatabaseInfo, ObjectType, Result, type_codes};

use crate::connection::Row;
use crate::context::InspectionContext;
use crate::dialect::{Dialect, IdentifierCase};
use crate::generic::{
    merge_auto_increment, merge_check, merge_sequence, merge_trigger, merge_user_defined_type,
};
use crate::inspector::{InspectionQuery, Query, Source, UnsupportedInspector, query_inspector};
use crate::manager::InspectionManager;
use crate::scope::InspectionScope;

pub const PRODUCT_NAME: &str = "Microsoft SQL Server";

/// Schemas owned by the fixed database roles.
const ROLE_SCHEMAS: &[&str] = &[
    "db_owner",
    "db_accessadmin",
    "db_securityadmin",
    "db_ddladmin",
    "db_backupoperator",
    "db_datareader",
    "db_datawriter",
    "db_denydatareader",
    "db_denydatawriter",
];

#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl Dialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Preserve
    }

    fn quote(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@P{index}")
    }

    fn jdbc_type_alias(&self, type_code: i32, type_name: &str) -> i32 {
        match type_name.to_lowercase().as_str() {
            "ntext" | "text" => type_codes::LONGVARCHAR,
            "image" => type_codes::LONGVARBINARY,
            "bit" => type_codes::BOOLEAN,
            _ => type_code,
        }
    }

    fn is_system_schema(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case("sys")
            || name.eq_ignore_ascii_case("INFORMATION_SCHEMA")
            || ROLE_SCHEMAS.iter().any(|role| name.eq_ignore_ascii_case(role))
    }
}

/// `base` restricted to the scope, with the schema aliased `s` and the table `t`.
fn table_filtered(
    context: &InspectionContext<'_>,
    base: &str,
    scope: &InspectionScope,
    order: &str,
) -> Query {
    Query::filtered(
        context.dialect(),
        base,
        &[
            ("DB_NAME()", scope.catalog.as_deref()),
            ("s.name", scope.schema.as_deref()),
            ("t.name", scope.table.as_deref()),
        ],
        order,
    )
}

const IDENTITY: &str = "SELECT DB_NAME() AS TABLE_CAT, \
     s.name AS TABLE_SCHEM, \
     t.name AS TABLE_NAME, \
     ic.name AS COLUMN_NAME, \
     CAST(ic.seed_value AS bigint) AS START_WITH, \
     CAST(ic.increment_value AS bigint) AS INCREMENT_BY, \
     CAST(ic.last_value AS bigint) AS LAST_VALUE \
     FROM sys.identity_columns ic \
     JOIN sys.tables t ON t.object_id = ic.object_id \
     JOIN sys.schemas s ON s.schema_id = t.schema_id \
     WHERE 1 = 1";

/// Identity columns with their seed, increment and last value.
#[derive(Debug, Clone, Default)]
pub struct MssqlIdentityQuery;

impl InspectionQuery for MssqlIdentityQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::AutoIncrement
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        Some(ObjectType::Table)
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, IDENTITY, scope, "ORDER BY ic.column_id"))
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

const CHECKS: &str = "SELECT DB_NAME() AS TABLE_CAT, \
     s.name AS TABLE_SCHEM, \
     t.name AS TABLE_NAME, \
     cc.name AS CHECK_NAME, \
     cc.definition AS CHECK_TEXT, \
     CASE WHEN cc.parent_column_id > 0 \
       THEN COL_NAME(cc.parent_object_id, cc.parent_column_id) END AS COLUMN_NAME \
     FROM sys.check_constraints cc \
     JOIN sys.tables t ON t.object_id = cc.parent_object_id \
     JOIN sys.schemas s ON s.schema_id = t.schema_id \
     WHERE cc.is_disabled = 0";

#[derive(Debug, Clone, Default)]
pub struct MssqlCheckQuery;

impl InspectionQuery for MssqlCheckQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Check
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, CHECKS, scope, "ORDER BY cc.name"))
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

const TRIGGERS: &str = "SELECT DB_NAME() AS TABLE_CAT, \
     s.name AS TABLE_SCHEM, \
     t.name AS TABLE_NAME, \
     tr.name AS TRIGGER_NAME, \
     CASE WHEN tr.is_instead_of_trigger = 1 THEN 'INSTEAD OF' ELSE 'AFTER' END AS TRIGGER_TIMING, \
     CASE WHEN OBJECTPROPERTY(tr.object_id, 'ExecIsInsertTrigger') = 1 THEN 'INSERT ' ELSE '' END \
       + CASE WHEN OBJECTPROPERTY(tr.object_id, 'ExecIsUpdateTrigger') = 1 THEN 'UPDATE ' ELSE '' END \
       + CASE WHEN OBJECTPROPERTY(tr.object_id, 'ExecIsDeleteTrigger') = 1 THEN 'DELETE' ELSE '' END \
       AS TRIGGER_EVENT, \
     'STATEMENT' AS TRIGGER_LEVEL, \
     OBJECT_DEFINITION(tr.object_id) AS TRIGGER_BODY, \
     CAST(CASE WHEN tr.is_disabled = 0 THEN 1 ELSE 0 END AS bit) AS ACTIVE \
     FROM sys.triggers tr \
     JOIN sys.tables t ON t.object_id = tr.parent_id \
     JOIN sys.schemas s ON s.schema_id = t.schema_id \
     WHERE tr.parent_class = 1";

/// DML triggers on tables. SQL Server fires them once per statement.
#[derive(Debug, Clone, Default)]
pub struct MssqlTriggerQuery;

impl InspectionQuery for MssqlTriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Trigger
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, TRIGGERS, scope, "ORDER BY tr.name"))
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

const SEQUENCES: &str = "SELECT DB_NAME() AS SEQUENCE_CAT, \
     s.name AS SEQUENCE_SCHEM, \
     q.name AS SEQUENCE_NAME, \
     CAST(q.start_value AS decimal(38, 0)) AS START_WITH, \
     CAST(q.increment AS decimal(38, 0)) AS INCREMENT_BY, \
     CAST(q.minimum_value AS decimal(38, 0)) AS MIN_VALUE, \
     CAST(q.maximum_value AS decimal(38, 0)) AS MAX_VALUE, \
     CAST(q.current_value AS decimal(38, 0)) AS LAST_VALUE, \
     q.is_cycling AS CYCLE, \
     q.cache_size AS CACHE_SIZE \
     FROM sys.sequences q \
     JOIN sys.schemas s ON s.schema_id = q.schema_id \
     WHERE 1 = 1";

/// Sequence objects, available from SQL Server 2012 (version 11).
#[derive(Debug, Clone, Default)]
pub struct MssqlSequenceQuery;

impl InspectionQuery for MssqlSequenceQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Sequence
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            SEQUENCES,
            &[
                ("DB_NAME()", scope.catalog.as_deref()),
                ("s.name", scope.schema.as_deref()),
            ],
            "ORDER BY s.name, q.name",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_sequence(context, row)
    }
}

const ALIAS_TYPES: &str = "SELECT DB_NAME() AS TYPE_CAT, \
     s.name AS TYPE_SCHEM, \
     ut.name AS TYPE_NAME, \
     'distinct' AS TYPE_KIND, \
     2001 AS DATA_TYPE, \
     bt.name AS BASE_TYPE \
     FROM sys.types ut \
     JOIN sys.schemas s ON s.schema_id = ut.schema_id \
     JOIN sys.types bt ON bt.user_type_id = ut.system_type_id \
     WHERE ut.is_user_defined = 1 AND ut.is_table_type = 0";

/// Alias types created with `CREATE TYPE ... FROM`.
#[derive(Debug, Clone, Default)]
pub struct MssqlAliasTypeQuery;

impl InspectionQuery for MssqlAliasTypeQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::UserDefinedType
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            ALIAS_TYPES,
            &[
                ("DB_NAME()", scope.catalog.as_deref()),
                ("s.name", scope.schema.as_deref()),
            ],
            "ORDER BY s.name, ut.name",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_user_defined_type(context, row)
    }
}

/// Install the SQL Server inspectors.
pub fn register(manager: &mut InspectionManager) {
    let product = DatabaseInfo::new(PRODUCT_NAME);
    manager.register(product.clone(), query_inspector(MssqlIdentityQuery));
    manager.register(product.clone(), query_inspector(MssqlCheckQuery));
    manager.register(product.clone(), query_inspector(MssqlTriggerQuery));
    manager.register(product.clone(), query_inspector(MssqlAliasTypeQuery));
    manager.register(product.clone(), Arc::new(UnsupportedInspector(ObjectType::Sequence)));
    manager.register(product.with_major(11), query_inspector(MssqlSequenceQuery));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_quoting() {
        assert_eq!(MssqlDialect.quote("order]lines"), "[order]]lines]");
    }

    #[test]
    fn named_placeholders() {
        assert_eq!(MssqlDialect.placeholder(1), "@P1");
        assert_eq!(MssqlDialect.placeholder(3), "@P3");
    }

    #[test]
    fn fixed_role_schemas_are_system() {
        assert!(MssqlDialect.is_system_schema("db_owner"));
        assert!(MssqlDialect.is_system_schema("sys"));
        assert!(MssqlDialect.is_system_schema("DB_DATAREADER"));
        assert!(!MssqlDialect.is_system_schema("dbo"));
        assert!(!MssqlDialect.is_system_schema("db_archive"));
    }
}

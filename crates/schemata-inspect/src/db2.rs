//! DB2 for Linux, Unix and Windows, read from the `SYSCAT` views.
//!
//! Products report themselves as `DB2/<platform>`, so registrations use the
//! `DB2` prefix.

use schemata_core::{DatabaseInfo, ObjectType, Result};

use crate::connection::Row;
use crate::context::InspectionContext;
use crate::dialect::Dialect;
use crate::generic::{merge_auto_increment, merge_check, merge_sequence, merge_trigger};
use crate::inspector::{InspectionQuery, Query, Source, query_inspector};
use crate::manager::InspectionManager;
use crate::scope::InspectionScope;

pub const PRODUCT_NAME: &str = "DB2";

#[derive(Debug, Clone, Default)]
pub struct Db2Dialect;

impl Dialect for Db2Dialect {
    fn name(&self) -> &'static str {
        "db2"
    }

    fn is_system_schema(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        upper.starts_with("SYS") || upper == "NULLID" || upper == "SQLJ"
    }
}

fn table_filtered(
    context: &InspectionContext<'_>,
    base: &str,
    scope: &InspectionScope,
    alias: &str,
    order: &str,
) -> Query {
    let schema_column = format!("{alias}.TABSCHEMA");
    let table_column = format!("{alias}.TABNAME");
    Query::filtered(
        context.dialect(),
        base,
        &[
            (schema_column.as_str(), scope.schema.as_deref()),
            (table_column.as_str(), scope.table.as_deref()),
        ],
        order,
    )
}

const CHECKS: &str = "SELECT CURRENT SERVER AS TABLE_CAT, \
     RTRIM(c.TABSCHEMA) AS TABLE_SCHEM, \
     c.TABNAME AS TABLE_NAME, \
     c.CONSTNAME AS CHECK_NAME, \
     c.TEXT AS CHECK_TEXT, \
     (SELECT MAX(cc.COLNAME) FROM SYSCAT.COLCHECKS cc \
       WHERE cc.TABSCHEMA = c.TABSCHEMA AND cc.TABNAME = c.TABNAME \
       AND cc.CONSTNAME = c.CONSTNAME HAVING COUNT(*) = 1) AS COLUMN_NAME \
     FROM SYSCAT.CHECKS c \
     WHERE c.TYPE = 'C'";

#[derive(Debug, Clone, Default)]
pub struct Db2CheckQuery;

impl InspectionQuery for Db2CheckQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Check
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, CHECKS, scope, "c", "ORDER BY c.CONSTNAME"))
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

const SEQUENCES: &str = "SELECT CURRENT SERVER AS SEQUENCE_CAT, \
     RTRIM(s.SEQSCHEMA) AS SEQUENCE_SCHEM, \
     s.SEQNAME AS SEQUENCE_NAME, \
     s.START AS START_WITH, \
     s.INCREMENT AS INCREMENT_BY, \
     s.MINVALUE AS MIN_VALUE, \
     s.MAXVALUE AS MAX_VALUE, \
     s.CYCLE AS CYCLE, \
     s.CACHE AS CACHE_SIZE \
     FROM SYSCAT.SEQUENCES s \
     WHERE s.SEQTYPE = 'S'";

/// User sequences; identity generators have `SEQTYPE = 'I'`.
#[derive(Debug, Clone, Default)]
pub struct Db2SequenceQuery;

impl InspectionQuery for Db2SequenceQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Sequence
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            SEQUENCES,
            &[("s.SEQSCHEMA", scope.schema.as_deref())],
            "ORDER BY s.SEQSCHEMA, s.SEQNAME",
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

const IDENTITY: &str = "SELECT CURRENT SERVER AS TABLE_CAT, \
     RTRIM(i.TABSCHEMA) AS TABLE_SCHEM, \
     i.TABNAME AS TABLE_NAME, \
     i.COLNAME AS COLUMN_NAME, \
     i.START AS START_WITH, \
     i.INCREMENT AS INCREMENT_BY, \
     i.MINVALUE AS MIN_VALUE, \
     i.MAXVALUE AS MAX_VALUE, \
     i.CYCLE AS CYCLE, \
     i.CACHE AS CACHE_SIZE \
     FROM SYSCAT.COLIDENTATTRIBUTES i \
     WHERE 1 = 1";

#[derive(Debug, Clone, Default)]
pub struct Db2IdentityQuery;

impl InspectionQuery for Db2IdentityQuery {
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
        Source::Query(table_filtered(context, IDENTITY, scope, "i", "ORDER BY i.COLNAME"))
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

const TRIGGERS: &str = "SELECT CURRENT SERVER AS TABLE_CAT, \
     RTRIM(t.TABSCHEMA) AS TABLE_SCHEM, \
     t.TABNAME AS TABLE_NAME, \
     t.TRIGNAME AS TRIGGER_NAME, \
     CASE t.TRIGTIME WHEN 'B' THEN 'BEFORE' WHEN 'I' THEN 'INSTEAD OF' ELSE 'AFTER' END \
       AS TRIGGER_TIMING, \
     CASE t.TRIGEVENT WHEN 'I' THEN 'INSERT' WHEN 'U' THEN 'UPDATE' WHEN 'D' THEN 'DELETE' \
       ELSE t.TRIGEVENT END AS TRIGGER_EVENT, \
     CASE t.GRANULARITY WHEN 'R' THEN 'ROW' ELSE 'STATEMENT' END AS TRIGGER_LEVEL, \
     t.TEXT AS TRIGGER_BODY, \
     t.VALID AS ACTIVE \
     FROM SYSCAT.TRIGGERS t \
     WHERE 1 = 1";

#[derive(Debug, Clone, Default)]
pub struct Db2TriggerQuery;

impl InspectionQuery for Db2TriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Trigger
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, TRIGGERS, scope, "t", "ORDER BY t.TRIGNAME"))
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

/// Install the DB2 inspectors.
pub fn register(manager: &mut InspectionManager) {
    let product = DatabaseInfo::new(PRODUCT_NAME);
    manager.register(product.clone(), query_inspector(Db2CheckQuery));
    manager.register(product.clone(), query_inspector(Db2SequenceQuery));
    manager.register(product.clone(), query_inspector(Db2IdentityQuery));
    manager.register(product, query_inspector(Db2TriggerQuery));
}

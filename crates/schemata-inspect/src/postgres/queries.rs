use schemata_core::{ObjectType, Result};

use crate::connection::Row;
use crate::context::InspectionContext;
use crate::generic::{
    merge_auto_increment, merge_check, merge_sequence, merge_trigger, merge_user_defined_type,
};
use crate::inspector::{InspectionQuery, Query, Source};
use crate::scope::InspectionScope;

const SEQUENCES: &str = "SELECT current_database()::text AS SEQUENCE_CAT, \
     s.schemaname::text AS SEQUENCE_SCHEM, \
     s.sequencename::text AS SEQUENCE_NAME, \
     s.start_value AS START_WITH, \
     s.increment_by AS INCREMENT_BY, \
     s.min_value AS MIN_VALUE, \
     s.max_value AS MAX_VALUE, \
     s.last_value AS LAST_VALUE, \
     s.cycle AS CYCLE, \
     s.cache_size AS CACHE_SIZE, \
     c.relpersistence = 't' AS TEMPORARY \
     FROM pg_catalog.pg_sequences s \
     JOIN pg_catalog.pg_namespace n ON n.nspname = s.schemaname \
     JOIN pg_catalog.pg_class c ON c.relnamespace = n.oid AND c.relname = s.sequencename \
     WHERE NOT EXISTS (SELECT 1 FROM pg_catalog.pg_depend d \
       WHERE d.classid = 'pg_catalog.pg_class'::regclass AND d.objid = c.oid \
       AND d.deptype IN ('a', 'i'))";

/// Sequences from `pg_sequences` (10+) not owned by a column.
#[derive(Debug, Clone, Default)]
pub struct PgSequenceQuery;

impl InspectionQuery for PgSequenceQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Sequence
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            SEQUENCES,
            &[
                ("current_database()::text", scope.catalog.as_deref()),
                ("s.schemaname", scope.schema.as_deref()),
            ],
            "ORDER BY s.schemaname, s.sequencename",
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

const AUTO_INCREMENT: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     a.attname::text AS COLUMN_NAME, \
     s.relname::text AS SEQUENCE_NAME, \
     q.seqstart AS START_WITH, \
     q.seqincrement AS INCREMENT_BY, \
     q.seqmin AS MIN_VALUE, \
     q.seqmax AS MAX_VALUE, \
     q.seqcycle AS CYCLE, \
     q.seqcache AS CACHE_SIZE \
     FROM pg_catalog.pg_depend d \
     JOIN pg_catalog.pg_class s ON s.oid = d.objid AND s.relkind = 'S' \
     JOIN pg_catalog.pg_sequence q ON q.seqrelid = s.oid \
     JOIN pg_catalog.pg_class c ON c.oid = d.refobjid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = d.refobjsubid \
     WHERE d.classid = 'pg_catalog.pg_class'::regclass \
     AND d.refclassid = 'pg_catalog.pg_class'::regclass \
     AND d.deptype IN ('a', 'i')";

/// Identity and serial columns with the sequence behind them.
#[derive(Debug, Clone, Default)]
pub struct PgAutoIncrementQuery;

impl InspectionQuery for PgAutoIncrementQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::AutoIncrement
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        Some(ObjectType::Table)
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, AUTO_INCREMENT, scope, "a.attnum"))
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

const CHECKS: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     con.conname::text AS CHECK_NAME, \
     pg_catalog.pg_get_constraintdef(con.oid, true) AS CHECK_TEXT, \
     CASE WHEN array_length(con.conkey, 1) = 1 THEN a.attname::text END AS COLUMN_NAME \
     FROM pg_catalog.pg_constraint con \
     JOIN pg_catalog.pg_class c ON c.oid = con.conrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = con.conkey[1] \
     WHERE con.contype = 'c'";

/// Table check constraints with their full definition.
#[derive(Debug, Clone, Default)]
pub struct PgCheckQuery;

impl InspectionQuery for PgCheckQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Check
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, CHECKS, scope, "con.conname"))
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

const TRIGGERS: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     t.tgname::text AS TRIGGER_NAME, \
     CASE WHEN t.tgtype::int4 & 2 <> 0 THEN 'BEFORE' \
       WHEN t.tgtype::int4 & 64 <> 0 THEN 'INSTEAD OF' \
       ELSE 'AFTER' END AS TRIGGER_TIMING, \
     concat_ws(' OR ', \
       CASE WHEN t.tgtype::int4 & 4 <> 0 THEN 'INSERT' END, \
       CASE WHEN t.tgtype::int4 & 16 <> 0 THEN 'UPDATE' END, \
       CASE WHEN t.tgtype::int4 & 8 <> 0 THEN 'DELETE' END, \
       CASE WHEN t.tgtype::int4 & 32 <> 0 THEN 'TRUNCATE' END) AS TRIGGER_EVENT, \
     CASE WHEN t.tgtype::int4 & 1 <> 0 THEN 'ROW' ELSE 'STATEMENT' END AS TRIGGER_LEVEL, \
     pg_catalog.pg_get_triggerdef(t.oid, true) AS TRIGGER_BODY, \
     t.tgenabled <> 'D' AS ACTIVE \
     FROM pg_catalog.pg_trigger t \
     JOIN pg_catalog.pg_class c ON c.oid = t.tgrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE NOT t.tgisinternal";

/// User triggers from `pg_trigger`, decoded from the `tgtype` bit mask.
#[derive(Debug, Clone, Default)]
pub struct PgTriggerQuery;

impl InspectionQuery for PgTriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Trigger
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(context, TRIGGERS, scope, "t.tgname"))
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

const USER_DEFINED_TYPES: &str = "SELECT current_database()::text AS TYPE_CAT, \
     n.nspname::text AS TYPE_SCHEM, \
     t.typname::text AS TYPE_NAME, \
     CASE t.typtype WHEN 'e' THEN 'enum' WHEN 'd' THEN 'domain' ELSE 'composite' END AS TYPE_KIND, \
     CASE t.typtype WHEN 'c' THEN 2002 WHEN 'd' THEN 2001 ELSE 1111 END AS DATA_TYPE, \
     CASE WHEN t.typtype = 'd' \
       THEN pg_catalog.format_type(t.typbasetype, t.typtypmod) END AS BASE_TYPE, \
     (SELECT string_agg(e.enumlabel::text, ',' ORDER BY e.enumsortorder) \
       FROM pg_catalog.pg_enum e WHERE e.enumtypid = t.oid) AS TYPE_VALUES, \
     (SELECT string_agg(pg_catalog.pg_get_constraintdef(k.oid, true), ' ') \
       FROM pg_catalog.pg_constraint k WHERE k.contypid = t.oid) AS DEFINITION, \
     pg_catalog.obj_description(t.oid, 'pg_type') AS REMARKS \
     FROM pg_catalog.pg_type t \
     JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
     WHERE (t.typtype IN ('e', 'd') OR (t.typtype = 'c' AND EXISTS ( \
       SELECT 1 FROM pg_catalog.pg_class r WHERE r.oid = t.typrelid AND r.relkind = 'c')))";

/// Enum, domain and composite types.
#[derive(Debug, Clone, Default)]
pub struct PgUserDefinedTypeQuery;

impl InspectionQuery for PgUserDefinedTypeQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::UserDefinedType
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            USER_DEFINED_TYPES,
            &[
                ("current_database()::text", scope.catalog.as_deref()),
                ("n.nspname", scope.schema.as_deref()),
            ],
            "ORDER BY n.nspname, t.typname",
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

/// `base` restricted to the scope's table, aliased `n`/`c`.
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
            ("current_database()::text", scope.catalog.as_deref()),
            ("n.nspname", scope.schema.as_deref()),
            ("c.relname", scope.table.as_deref()),
        ],
        &format!("ORDER BY {order}"),
    )
}

//! Oracle. Schemas are users; there is no catalog level.

use async_trait::async_trait;
use tracing::{debug, warn};

use schemata_core::{DatabaseInfo, ObjectType, Result, type_codes};

use crate::connection::{Connection, Row, labels};
use crate::context::InspectionContext;
use crate::dialect::Dialect;
use crate::generic::{merge_auto_increment, merge_check, merge_sequence, merge_trigger};
use crate::inspector::{InspectionQuery, Query, Source, query_inspector};
use crate::manager::InspectionManager;
use crate::scope::InspectionScope;

pub const PRODUCT_NAME: &str = "Oracle";

/// `open_cursors` default, used when `v$parameter` is not readable.
pub const DEFAULT_OPEN_CURSORS: usize = 50;

const OPEN_CURSORS: &str = "SELECT value FROM v$parameter WHERE name = 'open_cursors'";

const SYSTEM_SCHEMAS: &[&str] = &[
    "SYS",
    "SYSTEM",
    "OUTLN",
    "XDB",
    "MDSYS",
    "CTXSYS",
    "DBSNMP",
    "ORDSYS",
    "ORDDATA",
    "WMSYS",
    "LBACSYS",
    "OJVMSYS",
    "GSMADMIN_INTERNAL",
    "APPQOSSYS",
    "AUDSYS",
];

#[derive(Debug, Clone, Default)]
pub struct OracleDialect;

#[async_trait]
impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn jdbc_type_alias(&self, type_code: i32, type_name: &str) -> i32 {
        // DATE carries a time of day.
        if type_code == type_codes::DATE && type_name.eq_ignore_ascii_case("DATE") {
            type_codes::TIMESTAMP
        } else {
            type_code
        }
    }

    fn is_system_schema(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        SYSTEM_SCHEMAS.contains(&upper.as_str()) || upper.starts_with("APEX_")
    }

    async fn max_open_cursors(&self, connection: &mut dyn Connection) -> Result<usize> {
        match read_open_cursors(connection).await {
            Ok(Some(limit)) => {
                debug!(limit, "read open_cursors");
                Ok(limit)
            }
            Ok(None) => {
                warn!(fallback = DEFAULT_OPEN_CURSORS, "open_cursors not reported");
                Ok(DEFAULT_OPEN_CURSORS)
            }
            Err(error) => {
                warn!(%error, fallback = DEFAULT_OPEN_CURSORS, "cannot read open_cursors");
                Ok(DEFAULT_OPEN_CURSORS)
            }
        }
    }
}

async fn read_open_cursors(connection: &mut dyn Connection) -> Result<Option<usize>> {
    let statement = connection.prepare(OPEN_CURSORS).await?;
    let rows = connection.execute(&statement, &[]).await;
    if let Err(error) = connection.close_statement(&statement).await {
        warn!(%error, "failed to close open_cursors statement");
    }
    let limit = rows?
        .first()
        .and_then(|row| row.int("VALUE"))
        .and_then(|value| usize::try_from(value).ok());
    Ok(limit)
}

/// `base` restricted to the scope's owner and table.
fn table_filtered(
    context: &InspectionContext<'_>,
    base: &str,
    scope: &InspectionScope,
    owner_column: &str,
    table_column: &str,
    order: &str,
) -> Query {
    Query::filtered(
        context.dialect(),
        base,
        &[
            (owner_column, scope.schema.as_deref()),
            (table_column, scope.table.as_deref()),
        ],
        order,
    )
}

const CHECKS: &str = "SELECT NULL AS TABLE_CAT, \
     c.owner AS TABLE_SCHEM, \
     c.table_name AS TABLE_NAME, \
     c.constraint_name AS CHECK_NAME, \
     c.search_condition AS CHECK_TEXT, \
     (SELECT MAX(cc.column_name) FROM all_cons_columns cc \
       WHERE cc.owner = c.owner AND cc.constraint_name = c.constraint_name \
       HAVING COUNT(*) = 1) AS COLUMN_NAME \
     FROM all_constraints c \
     WHERE c.constraint_type = 'C' AND c.status = 'ENABLED'";

/// Check constraints from `ALL_CONSTRAINTS`, without the implicit ones
/// backing `NOT NULL` columns.
#[derive(Debug, Clone, Default)]
pub struct OracleCheckQuery;

impl InspectionQuery for OracleCheckQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Check
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(
            context,
            CHECKS,
            scope,
            "c.owner",
            "c.table_name",
            "ORDER BY c.constraint_name",
        ))
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        if is_not_null_condition(row) {
            return Ok(());
        }
        merge_check(context, row)
    }
}

/// `"COL" IS NOT NULL` on the constraint's single column.
fn is_not_null_condition(row: &Row) -> bool {
    let (Some(text), Some(column)) = (row.string(labels::CHECK_TEXT), row.string(labels::COLUMN_NAME))
    else {
        return false;
    };
    let text = text.trim().replace('"', "");
    text.eq_ignore_ascii_case(&format!("{column} IS NOT NULL"))
}

const SEQUENCES: &str = "SELECT NULL AS SEQUENCE_CAT, \
     s.sequence_owner AS SEQUENCE_SCHEM, \
     s.sequence_name AS SEQUENCE_NAME, \
     s.min_value AS MIN_VALUE, \
     s.max_value AS MAX_VALUE, \
     s.increment_by AS INCREMENT_BY, \
     s.cycle_flag AS CYCLE, \
     s.cache_size AS CACHE_SIZE, \
     s.last_number AS LAST_VALUE \
     FROM all_sequences s \
     WHERE s.sequence_name NOT LIKE 'ISEQ$$%'";

/// Sequences, skipping the generators behind identity columns.
#[derive(Debug, Clone, Default)]
pub struct OracleSequenceQuery;

impl InspectionQuery for OracleSequenceQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Sequence
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            SEQUENCES,
            &[("s.sequence_owner", scope.schema.as_deref())],
            "ORDER BY s.sequence_owner, s.sequence_name",
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

const IDENTITY: &str = "SELECT NULL AS TABLE_CAT, \
     ic.owner AS TABLE_SCHEM, \
     ic.table_name AS TABLE_NAME, \
     ic.column_name AS COLUMN_NAME, \
     ic.sequence_name AS SEQUENCE_NAME, \
     s.min_value AS MIN_VALUE, \
     s.max_value AS MAX_VALUE, \
     s.increment_by AS INCREMENT_BY, \
     s.cycle_flag AS CYCLE, \
     s.cache_size AS CACHE_SIZE, \
     s.last_number AS LAST_VALUE \
     FROM all_tab_identity_cols ic \
     JOIN all_sequences s ON s.sequence_owner = ic.owner AND s.sequence_name = ic.sequence_name \
     WHERE 1 = 1";

/// Identity columns, available from Oracle 12c.
#[derive(Debug, Clone, Default)]
pub struct OracleIdentityQuery;

impl InspectionQuery for OracleIdentityQuery {
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
        Source::Query(table_filtered(
            context,
            IDENTITY,
            scope,
            "ic.owner",
            "ic.table_name",
            "ORDER BY ic.column_name",
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

const TRIGGERS: &str = "SELECT NULL AS TABLE_CAT, \
     t.table_owner AS TABLE_SCHEM, \
     t.table_name AS TABLE_NAME, \
     t.trigger_name AS TRIGGER_NAME, \
     t.trigger_type AS TRIGGER_TIMING, \
     t.triggering_event AS TRIGGER_EVENT, \
     CASE WHEN t.trigger_type LIKE '%EACH ROW' THEN 'ROW' ELSE 'STATEMENT' END AS TRIGGER_LEVEL, \
     t.trigger_body AS TRIGGER_BODY, \
     t.status AS ACTIVE \
     FROM all_triggers t \
     WHERE t.base_object_type = 'TABLE'";

#[derive(Debug, Clone, Default)]
pub struct OracleTriggerQuery;

impl InspectionQuery for OracleTriggerQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Trigger
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        scope.has_schema_and_table()
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(table_filtered(
            context,
            TRIGGERS,
            scope,
            "t.table_owner",
            "t.table_name",
            "ORDER BY t.trigger_name",
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

/// Install the Oracle inspectors.
pub fn register(manager: &mut InspectionManager) {
    let product = DatabaseInfo::new(PRODUCT_NAME);
    manager.register(product.clone(), query_inspector(OracleCheckQuery));
    manager.register(product.clone(), query_inspector(OracleSequenceQuery));
    manager.register(product.clone(), query_inspector(OracleTriggerQuery));
    manager.register(product.with_major(12), query_inspector(OracleIdentityQuery));
}

//! Driver metadata calls answered from `pg_catalog`, with result columns
//! aliased to the standard labels.

use crate::connection::{MetaDataRequest, Row, labels};
use crate::inspector::Query;

use super::PostgresDialect;

const CATALOGS: &str = "SELECT current_database()::text AS TABLE_CAT";

const SCHEMAS: &str = "SELECT n.nspname::text AS TABLE_SCHEM, \
     current_database()::text AS TABLE_CATALOG \
     FROM pg_catalog.pg_namespace n \
     WHERE n.nspname NOT LIKE 'pg\\_temp\\_%' AND n.nspname NOT LIKE 'pg\\_toast\\_temp\\_%'";

const TABLES: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     CASE c.relkind \
       WHEN 'r' THEN 'TABLE' \
       WHEN 'p' THEN 'PARTITIONED TABLE' \
       WHEN 'v' THEN 'VIEW' \
       WHEN 'm' THEN 'MATERIALIZED VIEW' \
       WHEN 'f' THEN 'FOREIGN TABLE' \
     END AS TABLE_TYPE, \
     pg_catalog.obj_description(c.oid, 'pg_class') AS REMARKS \
     FROM pg_catalog.pg_class c \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')";

const COLUMNS: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     a.attname::text AS COLUMN_NAME, \
     CASE \
       WHEN t.typtype = 'd' THEN 2001 \
       WHEN t.typtype = 'e' THEN 12 \
       ELSE CASE t.typname \
         WHEN 'bool' THEN -7 WHEN 'int2' THEN 5 WHEN 'int4' THEN 4 WHEN 'int8' THEN -5 \
         WHEN 'float4' THEN 7 WHEN 'float8' THEN 8 WHEN 'numeric' THEN 2 \
         WHEN 'bpchar' THEN 1 WHEN 'varchar' THEN 12 WHEN 'text' THEN 12 \
         WHEN 'date' THEN 91 WHEN 'time' THEN 92 WHEN 'timetz' THEN 92 \
         WHEN 'timestamp' THEN 93 WHEN 'timestamptz' THEN 93 WHEN 'bytea' THEN -2 \
         ELSE CASE WHEN t.typcategory = 'A' THEN 2003 ELSE 1111 END \
       END \
     END AS DATA_TYPE, \
     t.typname::text AS TYPE_NAME, \
     CASE \
       WHEN t.typname IN ('bpchar', 'varchar') AND a.atttypmod > 0 THEN a.atttypmod - 4 \
       WHEN t.typname = 'numeric' AND a.atttypmod > 0 THEN ((a.atttypmod - 4) >> 16) & 65535 \
       WHEN t.typname = 'int2' THEN 5 \
       WHEN t.typname = 'int4' THEN 10 \
       WHEN t.typname = 'int8' THEN 19 \
       WHEN t.typname = 'float4' THEN 8 \
       WHEN t.typname = 'float8' THEN 17 \
     END AS COLUMN_SIZE, \
     CASE WHEN t.typname = 'numeric' AND a.atttypmod > 0 THEN (a.atttypmod - 4) & 65535 END \
       AS DECIMAL_DIGITS, \
     CASE WHEN a.attnotnull THEN 0 ELSE 1 END AS NULLABLE, \
     pg_catalog.col_description(c.oid, a.attnum) AS REMARKS, \
     pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS COLUMN_DEF, \
     a.attnum::int4 AS ORDINAL_POSITION, \
     CASE WHEN a.attnotnull THEN 'NO' ELSE 'YES' END AS IS_NULLABLE, \
     CASE WHEN a.attidentity <> '' \
       OR pg_catalog.pg_get_expr(d.adbin, d.adrelid) LIKE 'nextval(%' \
       THEN 'YES' ELSE 'NO' END AS IS_AUTOINCREMENT \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     JOIN pg_catalog.pg_type t ON t.oid = a.atttypid \
     LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum \
     WHERE a.attnum > 0 AND NOT a.attisdropped \
     AND c.relkind IN ('r', 'p', 'v', 'm', 'f')";

const PRIMARY_KEYS: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     a.attname::text AS COLUMN_NAME, \
     k.ord::int4 AS KEY_SEQ, \
     con.conname::text AS PK_NAME \
     FROM pg_catalog.pg_constraint con \
     JOIN pg_catalog.pg_class c ON c.oid = con.conrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true \
     JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum \
     WHERE con.contype = 'p'";

const IMPORTED_KEYS: &str = "SELECT current_database()::text AS PKTABLE_CAT, \
     pn.nspname::text AS PKTABLE_SCHEM, \
     pc.relname::text AS PKTABLE_NAME, \
     pa.attname::text AS PKCOLUMN_NAME, \
     current_database()::text AS FKTABLE_CAT, \
     fn.nspname::text AS FKTABLE_SCHEM, \
     fc.relname::text AS FKTABLE_NAME, \
     fa.attname::text AS FKCOLUMN_NAME, \
     k.ord::int4 AS KEY_SEQ, \
     CASE con.confupdtype WHEN 'c' THEN 0 WHEN 'r' THEN 1 WHEN 'n' THEN 2 WHEN 'd' THEN 4 ELSE 3 END \
       AS UPDATE_RULE, \
     CASE con.confdeltype WHEN 'c' THEN 0 WHEN 'r' THEN 1 WHEN 'n' THEN 2 WHEN 'd' THEN 4 ELSE 3 END \
       AS DELETE_RULE, \
     con.conname::text AS FK_NAME, \
     CASE WHEN con.condeferrable AND con.condeferred THEN 5 \
       WHEN con.condeferrable THEN 6 ELSE 7 END AS DEFERRABILITY \
     FROM pg_catalog.pg_constraint con \
     JOIN pg_catalog.pg_class fc ON fc.oid = con.conrelid \
     JOIN pg_catalog.pg_namespace fn ON fn.oid = fc.relnamespace \
     JOIN pg_catalog.pg_class pc ON pc.oid = con.confrelid \
     JOIN pg_catalog.pg_namespace pn ON pn.oid = pc.relnamespace \
     JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(fk_attnum, pk_attnum, ord) ON true \
     JOIN pg_catalog.pg_attribute fa ON fa.attrelid = fc.oid AND fa.attnum = k.fk_attnum \
     JOIN pg_catalog.pg_attribute pa ON pa.attrelid = pc.oid AND pa.attnum = k.pk_attnum \
     WHERE con.contype = 'f'";

const INDEX_INFO: &str = "SELECT current_database()::text AS TABLE_CAT, \
     n.nspname::text AS TABLE_SCHEM, \
     c.relname::text AS TABLE_NAME, \
     NOT i.indisunique AS NON_UNIQUE, \
     ic.relname::text AS INDEX_NAME, \
     3 AS TYPE, \
     k.ord::int4 AS ORDINAL_POSITION, \
     CASE WHEN k.attnum = 0 \
       THEN pg_catalog.pg_get_indexdef(i.indexrelid, k.ord::int4, true) \
       ELSE a.attname::text END AS COLUMN_NAME, \
     CASE WHEN i.indoption[(k.ord - 1)::int4]::int4 & 1 = 1 THEN 'D' ELSE 'A' END AS ASC_OR_DESC, \
     pg_catalog.pg_get_expr(i.indpred, i.indrelid) AS FILTER_CONDITION, \
     am.amname::text AS INDEX_TYPE, \
     pg_catalog.pg_get_indexdef(i.indexrelid) AS DEFINITION \
     FROM pg_catalog.pg_index i \
     JOIN pg_catalog.pg_class c ON c.oid = i.indrelid \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid \
     JOIN pg_catalog.pg_am am ON am.oid = ic.relam \
     JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) ON true \
     LEFT JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum \
     WHERE true";

const USER_DEFINED_TYPES: &str = "SELECT current_database()::text AS TYPE_CAT, \
     n.nspname::text AS TYPE_SCHEM, \
     t.typname::text AS TYPE_NAME, \
     CASE t.typtype WHEN 'c' THEN 2002 ELSE 2001 END AS DATA_TYPE, \
     pg_catalog.obj_description(t.oid, 'pg_type') AS REMARKS, \
     CASE WHEN t.typtype = 'd' \
       THEN pg_catalog.format_type(t.typbasetype, t.typtypmod) END AS BASE_TYPE \
     FROM pg_catalog.pg_type t \
     JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace \
     WHERE (t.typtype = 'd' OR (t.typtype = 'c' AND EXISTS ( \
       SELECT 1 FROM pg_catalog.pg_class r WHERE r.oid = t.typrelid AND r.relkind = 'c')))";

/// SQL and parameters answering `request`.
pub(crate) fn query_for(request: &MetaDataRequest) -> Query {
    let dialect = PostgresDialect;
    match request {
        MetaDataRequest::Catalogs => Query::new(CATALOGS),
        MetaDataRequest::Schemas { catalog, schema } => Query::filtered(
            &dialect,
            SCHEMAS,
            &[
                ("current_database()::text", catalog.as_deref()),
                ("n.nspname", schema.as_deref()),
            ],
            "ORDER BY TABLE_SCHEM",
        ),
        MetaDataRequest::Tables {
            catalog,
            schema,
            table,
            ..
        } => Query::filtered(
            &dialect,
            TABLES,
            &[
                ("current_database()::text", catalog.as_deref()),
                ("n.nspname", schema.as_deref()),
                ("c.relname", table.as_deref()),
            ],
            "ORDER BY TABLE_TYPE, TABLE_SCHEM, TABLE_NAME",
        ),
        MetaDataRequest::Columns {
            catalog,
            schema,
            table,
            column,
        } => Query::filtered(
            &dialect,
            COLUMNS,
            &[
                ("current_database()::text", catalog.as_deref()),
                ("n.nspname", schema.as_deref()),
                ("c.relname", table.as_deref()),
                ("a.attname", column.as_deref()),
            ],
            "ORDER BY TABLE_SCHEM, TABLE_NAME, ORDINAL_POSITION",
        ),
        MetaDataRequest::PrimaryKeys {
            catalog,
            schema,
            table,
        } => Query::filtered(
            &dialect,
            PRIMARY_KEYS,
            &[
                ("current_database()::text", catalog.as_deref()),
                ("n.nspname", schema.as_deref()),
                ("c.relname", table.as_deref()),
            ],
            "ORDER BY TABLE_SCHEM, TABLE_NAME, KEY_SEQ",
        ),
        MetaDataRequest::ImportedKeys {
            catalog,
            schema,
            table,
        } => Query::filtered(
            &dialect,
            IMPORTED_KEYS,
            &[
                ("current_database()::text", catalog.as_deref()),
                ("fn.nspname", schema.as_deref()),
                ("fc.relname", table.as_deref()),
            ],
            "ORDER BY PKTABLE_SCHEM, PKTABLE_NAME, FK_NAME, KEY_SEQ",
        ),
        MetaDataRequest::IndexInfo {
            catalog,
            schema,
            table,
            unique_only,
        } => {
            let base = if *unique_only {
                format!("{INDEX_INFO} AND i.indisunique")
            } else {
                INDEX_INFO.to_string()
            };
            Query::filtered(
                &dialect,
                &base,
                &[
                    ("current_database()::text", catalog.as_deref()),
                    ("n.nspname", schema.as_deref()),
                    ("c.relname", table.as_deref()),
                ],
                "ORDER BY NON_UNIQUE, INDEX_NAME, ORDINAL_POSITION",
            )
        }
        MetaDataRequest::UserDefinedTypes {
            catalog,
            schema,
            type_name,
        } => Query::filtered(
            &dialect,
            USER_DEFINED_TYPES,
            &[
                ("current_database()::text", catalog.as_deref()),
                ("n.nspname", schema.as_deref()),
                ("t.typname", type_name.as_deref()),
            ],
            "ORDER BY DATA_TYPE, TYPE_SCHEM, TYPE_NAME",
        ),
    }
}

/// Drop rows the SQL could not filter: table types outside the request.
pub(crate) fn retain_requested(request: &MetaDataRequest, rows: &mut Vec<Row>) {
    if let MetaDataRequest::Tables { types, .. } = request {
        if types.is_empty() {
            return;
        }
        rows.retain(|row| {
            row.string(labels::TABLE_TYPE).is_some_and(|kind| {
                types
                    .iter()
                    .any(|requested| requested.eq_ignore_ascii_case(&kind))
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Value;

    #[test]
    fn unrestricted_requests_bind_nothing() {
        let query = query_for(&MetaDataRequest::PrimaryKeys {
            catalog: None,
            schema: None,
            table: None,
        });
        assert!(query.params.is_empty());
        assert!(query.sql.ends_with("ORDER BY TABLE_SCHEM, TABLE_NAME, KEY_SEQ"));
    }

    #[test]
    fn restricted_levels_bind_numbered_patterns() {
        let query = query_for(&MetaDataRequest::Columns {
            catalog: None,
            schema: Some("app".into()),
            table: Some("orders".into()),
            column: None,
        });
        assert!(query.sql.contains("AND n.nspname LIKE $1 AND c.relname LIKE $2"));
        assert_eq!(query.params, vec![Value::from("app"), Value::from("orders")]);
    }

    #[test]
    fn table_types_filter_rows() {
        let request = MetaDataRequest::Tables {
            catalog: None,
            schema: None,
            table: None,
            types: vec!["VIEW".into()],
        };
        let mut rows = vec![
            Row::new().with(labels::TABLE_TYPE, "TABLE"),
            Row::new().with(labels::TABLE_TYPE, "view"),
        ];
        retain_requested(&request, &mut rows);
        assert_eq!(rows.len(), 1);
    }
}

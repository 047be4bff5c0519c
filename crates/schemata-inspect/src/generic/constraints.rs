use schemata_core::{
    Deferrability, ForeignKeyReference, IndexColumn, ObjectType, ReferentialAction, Result,
    SortOrder,
};

use crate::connection::{MetaDataRequest, Row, labels};
use crate::context::InspectionContext;
use crate::dialect::is_regular_identifier;
use crate::inspector::{InspectionQuery, Query, Source};
use crate::scope::InspectionScope;

use super::{
    FOREIGN_TABLE, PRIMARY_TABLE, TABLE, column_from_row, is_excluded, position, required,
    table_from_row,
};

/// Primary keys through the driver.
#[derive(Debug, Clone, Default)]
pub struct PrimaryKeyQuery;

impl InspectionQuery for PrimaryKeyQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::PrimaryKey
    }

    fn source(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::MetaData(MetaDataRequest::PrimaryKeys {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
            table: scope.table.clone(),
        })
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        if is_excluded(context, row, TABLE) {
            return Ok(());
        }
        let name = context.optional_identifier(row.string(labels::PK_NAME).as_deref());
        let table = table_from_row(context, row, TABLE, true)?;
        let column = column_from_row(context, table, row, labels::COLUMN_NAME)?;
        let results = context.results_mut();
        let key = results.add_primary_key(table, name);
        if let Some(node) = results.graph_mut().primary_key_mut(key) {
            let position = position(row, labels::KEY_SEQ, node.columns.len());
            node.columns.insert(position, column);
        }
        Ok(())
    }
}

/// Indexes through the driver's index listing.
#[derive(Debug, Clone, Default)]
pub struct IndexQuery;

impl InspectionQuery for IndexQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Index
    }

    fn source(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::MetaData(MetaDataRequest::IndexInfo {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
            table: scope.table.clone(),
            unique_only: false,
        })
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        merge_index(context, row)
    }
}

/// Merge one key part of an index. Rows carrying table statistics are
/// skipped. A `COLUMN_NAME` that is neither a known column nor a plain name
/// is kept as an expression.
pub fn merge_index(context: &mut InspectionContext<'_>, row: &Row) -> Result<()> {
    if row.int(labels::TYPE) == Some(labels::TABLE_INDEX_STATISTIC) || is_excluded(context, row, TABLE)
    {
        return Ok(());
    }
    let Some(index_name) = row.string(labels::INDEX_NAME) else {
        return Ok(());
    };
    let name = context.identifier(&index_name);
    let table = table_from_row(context, row, TABLE, true)?;

    let part = match row.string(labels::COLUMN_NAME) {
        Some(text) => {
            let identifier = context.identifier(&text);
            let known = context.results().find_column(table, &identifier);
            match known {
                Some(column) => Some((Some(column), None)),
                None if is_regular_identifier(&text) => {
                    Some((Some(context.results_mut().add_column(table, identifier)), None))
                }
                None => Some((None, Some(text))),
            }
        }
        None => None,
    };

    let results = context.results_mut();
    let index = results.add_index(table, Some(name));
    let Some(node) = results.graph_mut().index_mut(index) else {
        return Ok(());
    };
    node.unique = !row.boolean(labels::NON_UNIQUE).unwrap_or(true);
    if let Some(filter) = row.string(labels::FILTER_CONDITION) {
        node.filter_condition = Some(filter);
    }
    if let Some(index_type) = row.string(labels::INDEX_TYPE) {
        node.index_type = Some(index_type);
    }
    if let Some(definition) = row.string(labels::DEFINITION) {
        node.definition = Some(definition);
    }
    if let Some((column, expression)) = part {
        let position = position(row, labels::ORDINAL_POSITION, node.columns.len());
        node.columns.insert(
            position,
            IndexColumn {
                column,
                expression,
                sort_order: SortOrder::from_code(row.string(labels::ASC_OR_DESC).as_deref()),
            },
        );
    }
    Ok(())
}

/// Foreign keys owned by the tables in scope.
///
/// The referenced table is always created so the key has a target, but it
/// is only registered as a discovered table when it lies inside the scope.
#[derive(Debug, Clone, Default)]
pub struct ForeignKeyQuery;

impl InspectionQuery for ForeignKeyQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::ForeignKey
    }

    fn source(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::MetaData(MetaDataRequest::ImportedKeys {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
            table: scope.table.clone(),
        })
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        if is_excluded(context, row, FOREIGN_TABLE) {
            return Ok(());
        }
        let in_scope = scope.contains(
            row.string(labels::PKTABLE_CAT).as_deref(),
            row.string(labels::PKTABLE_SCHEM).as_deref(),
            row.string(labels::PKTABLE_NAME).as_deref(),
        );
        let name = context.optional_identifier(row.string(labels::FK_NAME).as_deref());

        let foreign_table = table_from_row(context, row, FOREIGN_TABLE, true)?;
        let primary_table = table_from_row(context, row, PRIMARY_TABLE, in_scope)?;
        let foreign_column = column_from_row(context, foreign_table, row, labels::FKCOLUMN_NAME)?;
        let primary_column = column_from_row(context, primary_table, row, labels::PKCOLUMN_NAME)?;

        let results = context.results_mut();
        let key = results.add_foreign_key(foreign_table, primary_table, name);
        let Some(node) = results.graph_mut().foreign_key_mut(key) else {
            return Ok(());
        };
        let position = position(row, labels::KEY_SEQ, node.references.len());
        node.references.insert(
            position,
            ForeignKeyReference {
                foreign_column,
                primary_column,
            },
        );
        if let Some(rule) = row.int(labels::UPDATE_RULE) {
            node.update_action = ReferentialAction::from_rule(rule);
        }
        if let Some(rule) = row.int(labels::DELETE_RULE) {
            node.delete_action = ReferentialAction::from_rule(rule);
        }
        if let Some(code) = row.int(labels::DEFERRABILITY) {
            node.deferrability = Deferrability::from_code(code);
        }
        Ok(())
    }
}

const CHECKS: &str = "SELECT tc.table_catalog AS TABLE_CAT, \
     tc.table_schema AS TABLE_SCHEM, \
     tc.table_name AS TABLE_NAME, \
     tc.constraint_name AS CHECK_NAME, \
     cc.check_clause AS CHECK_TEXT \
     FROM information_schema.table_constraints tc \
     JOIN information_schema.check_constraints cc \
     ON cc.constraint_catalog = tc.constraint_catalog \
     AND cc.constraint_schema = tc.constraint_schema \
     AND cc.constraint_name = tc.constraint_name \
     WHERE tc.constraint_type = 'CHECK'";

/// Check constraints from `information_schema`.
#[derive(Debug, Clone, Default)]
pub struct CheckQuery;

impl InspectionQuery for CheckQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Check
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::Query(Query::filtered(
            context.dialect(),
            CHECKS,
            &[
                ("tc.table_catalog", scope.catalog.as_deref()),
                ("tc.table_schema", scope.schema.as_deref()),
                ("tc.table_name", scope.table.as_deref()),
            ],
            "ORDER BY tc.table_schema, tc.table_name, tc.constraint_name",
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

/// Merge a check row labelled with the table labels, `CHECK_NAME`,
/// `CHECK_TEXT` and optionally the constrained `COLUMN_NAME`.
pub fn merge_check(context: &mut InspectionContext<'_>, row: &Row) -> Result<()> {
    if is_excluded(context, row, TABLE) {
        return Ok(());
    }
    let text = required(row, labels::CHECK_TEXT)?;
    let name = context.optional_identifier(row.string(labels::CHECK_NAME).as_deref());
    let table = table_from_row(context, row, TABLE, true)?;
    let column = match row.string(labels::COLUMN_NAME) {
        Some(_) => Some(column_from_row(context, table, row, labels::COLUMN_NAME)?),
        None => None,
    };
    let results = context.results_mut();
    let check = results.add_check(table, name, text);
    if let Some(node) = results.graph_mut().check_mut(check) {
        node.column = column.or(node.column);
    }
    Ok(())
}

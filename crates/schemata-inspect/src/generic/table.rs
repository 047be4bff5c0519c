use schemata_core::{ObjectType, Result, TableKind, type_codes};

use crate::connection::{MetaDataRequest, Row, labels};
use crate::context::InspectionContext;
use crate::inspector::{InspectionQuery, Source};
use crate::scope::InspectionScope;

use super::{TABLE, column_from_row, is_excluded, table_from_row};

/// Tables through the driver's table listing.
#[derive(Debug, Clone, Default)]
pub struct TableQuery;

impl InspectionQuery for TableQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Table
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        let types = if scope.table_types.is_empty() {
            context.options().table_types.clone()
        } else {
            scope.table_types.clone()
        };
        Source::MetaData(MetaDataRequest::Tables {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
            table: scope.table.clone(),
            types,
        })
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        if is_excluded(context, row, TABLE) {
            return Ok(());
        }
        let table_type = row.string(labels::TABLE_TYPE);
        if let Some(table_type) = &table_type {
            if !scope.accepts_table_type(table_type) {
                return Ok(());
            }
        }

        let table = table_from_row(context, row, TABLE, true)?;
        if let Some(node) = context.results_mut().graph_mut().table_mut(table) {
            if let Some(table_type) = &table_type {
                node.kind = TableKind::from_table_type(table_type);
            }
            node.comment = row.string(labels::REMARKS);
        }
        Ok(())
    }
}

/// Columns through the driver's column listing.
#[derive(Debug, Clone, Default)]
pub struct ColumnQuery;

impl InspectionQuery for ColumnQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::Column
    }

    fn source(&self, _context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        Source::MetaData(MetaDataRequest::Columns {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
            table: scope.table.clone(),
            column: None,
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

        let type_name = row.string(labels::TYPE_NAME).unwrap_or_default();
        let reported = row
            .int(labels::DATA_TYPE)
            .and_then(|code| i32::try_from(code).ok())
            .unwrap_or(type_codes::OTHER);
        let type_code = context.dialect().jdbc_type_alias(reported, &type_name);
        let size = row.int(labels::COLUMN_SIZE);
        let nullable = match row.int(labels::NULLABLE) {
            Some(0) => false,
            Some(_) => true,
            None => row.boolean(labels::IS_NULLABLE).unwrap_or(true),
        };

        let table = table_from_row(context, row, TABLE, true)?;
        let column = column_from_row(context, table, row, labels::COLUMN_NAME)?;
        if let Some(node) = context.results_mut().graph_mut().column_mut(column) {
            node.position = row
                .int(labels::ORDINAL_POSITION)
                .and_then(|position| i32::try_from(position).ok());
            node.column_type.type_code = type_code;
            node.column_type.type_name = type_name;
            node.column_type.size = size;
            node.column_type.precision = if is_numeric(type_code) { size } else { None };
            node.column_type.scale = row.int(labels::DECIMAL_DIGITS);
            node.nullable = nullable;
            node.default_value = row.string(labels::COLUMN_DEF);
            node.comment = row.string(labels::REMARKS);
            node.auto_increment |= row.boolean(labels::IS_AUTOINCREMENT).unwrap_or(false);
        }
        Ok(())
    }
}

fn is_numeric(type_code: i32) -> bool {
    matches!(
        type_code,
        type_codes::TINYINT
            | type_codes::SMALLINT
            | type_codes::INTEGER
            | type_codes::BIGINT
            | type_codes::FLOAT
            | type_codes::REAL
            | type_codes::DOUBLE
            | type_codes::NUMERIC
            | type_codes::DECIMAL
    )
}

/// Auto-increment columns as flagged by the driver's column listing. Product
/// strategies add the generator's settings.
#[derive(Debug, Clone, Default)]
pub struct AutoIncrementQuery;

impl InspectionQuery for AutoIncrementQuery {
    fn object_type(&self) -> ObjectType {
        ObjectType::AutoIncrement
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source {
        ColumnQuery.source(context, scope)
    }

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
        row: &Row,
    ) -> Result<()> {
        if row.boolean(labels::IS_AUTOINCREMENT) != Some(true) {
            return Ok(());
        }
        merge_auto_increment(context, row)
    }
}

/// Merge an auto-increment row: the table labels, `COLUMN_NAME`, and
/// optionally `SEQUENCE_NAME` plus the generator settings.
pub fn merge_auto_increment(context: &mut InspectionContext<'_>, row: &Row) -> Result<()> {
    if is_excluded(context, row, TABLE) {
        return Ok(());
    }
    let name = context.optional_identifier(row.string(labels::SEQUENCE_NAME).as_deref());
    let table = table_from_row(context, row, TABLE, true)?;
    let column = column_from_row(context, table, row, labels::COLUMN_NAME)?;
    let results = context.results_mut();
    let Some(sequence) = results.add_auto_increment(column, name) else {
        return Ok(());
    };
    if let Some(node) = results.graph_mut().sequence_mut(sequence) {
        super::sequence::apply_settings(node, row);
    }
    Ok(())
}

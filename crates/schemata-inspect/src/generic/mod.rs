//! Inspectors that work against any product through driver metadata calls
//! or the standard `information_schema` views.
//!
//! Product modules reuse the row mappers defined here; their queries alias
//! result columns to the same labels.

mod constraints;
mod database;
mod sequence;
mod table;
mod trigger;
mod user_defined_type;

pub use constraints::{
    CheckQuery, ForeignKeyQuery, IndexQuery, PrimaryKeyQuery, merge_check, merge_index,
};
pub use database::{CatalogInspector, DatabaseInspector, SchemaInspector};
pub use sequence::{SequenceQuery, merge_sequence};
pub use table::{AutoIncrementQuery, ColumnQuery, TableQuery, merge_auto_increment};
pub use trigger::{TriggerQuery, merge_trigger};
pub use user_defined_type::{UserDefinedTypeQuery, merge_user_defined_type};

use schemata_core::{Error, ObjectId, Result};

use crate::connection::{Row, labels};
use crate::context::InspectionContext;
use crate::inspector::query_inspector;
use crate::manager::InspectionManager;

/// Labels locating a table in a result row.
#[derive(Debug, Clone, Copy)]
pub struct TableLabels {
    pub catalog: &'static str,
    pub schema: &'static str,
    pub table: &'static str,
}

pub const TABLE: TableLabels = TableLabels {
    catalog: labels::TABLE_CAT,
    schema: labels::TABLE_SCHEM,
    table: labels::TABLE_NAME,
};

pub const PRIMARY_TABLE: TableLabels = TableLabels {
    catalog: labels::PKTABLE_CAT,
    schema: labels::PKTABLE_SCHEM,
    table: labels::PKTABLE_NAME,
};

pub const FOREIGN_TABLE: TableLabels = TableLabels {
    catalog: labels::FKTABLE_CAT,
    schema: labels::FKTABLE_SCHEM,
    table: labels::FKTABLE_NAME,
};

/// Install the generic inspector of every kind that has one.
pub fn register(manager: &mut InspectionManager) {
    manager.set_generic(std::sync::Arc::new(DatabaseInspector));
    manager.set_generic(std::sync::Arc::new(CatalogInspector));
    manager.set_generic(std::sync::Arc::new(SchemaInspector));
    manager.set_generic(query_inspector(UserDefinedTypeQuery));
    manager.set_generic(query_inspector(SequenceQuery));
    manager.set_generic(query_inspector(TableQuery));
    manager.set_generic(query_inspector(ColumnQuery));
    manager.set_generic(query_inspector(AutoIncrementQuery));
    manager.set_generic(query_inspector(PrimaryKeyQuery));
    manager.set_generic(query_inspector(IndexQuery));
    manager.set_generic(query_inspector(CheckQuery));
    manager.set_generic(query_inspector(ForeignKeyQuery));
    manager.set_generic(query_inspector(TriggerQuery));
}

pub(crate) fn required(row: &Row, label: &str) -> Result<String> {
    row.string(label)
        .ok_or_else(|| Error::Other(format!("result row has no {label} value")))
}

/// Whether the catalog or schema named in `row` is excluded from the run.
pub(crate) fn is_excluded(context: &InspectionContext<'_>, row: &Row, labels: TableLabels) -> bool {
    context.is_excluded_schema(row.string(labels.catalog).as_deref())
        || context.is_excluded_schema(row.string(labels.schema).as_deref())
}

/// Get or create the table named in `row`.
pub(crate) fn table_from_row(
    context: &mut InspectionContext<'_>,
    row: &Row,
    labels: TableLabels,
    register: bool,
) -> Result<ObjectId> {
    let name = context.identifier(&required(row, labels.table)?);
    let catalog = context.optional_identifier(row.string(labels.catalog).as_deref());
    let schema = context.optional_identifier(row.string(labels.schema).as_deref());
    Ok(context
        .results_mut()
        .add_table(catalog, schema, name, register))
}

/// Get or create the schema named by `catalog_label`/`schema_label`.
pub(crate) fn schema_from_row(
    context: &mut InspectionContext<'_>,
    row: &Row,
    catalog_label: &str,
    schema_label: &str,
) -> ObjectId {
    let catalog = context.optional_identifier(row.string(catalog_label).as_deref());
    let schema = context.optional_identifier(row.string(schema_label).as_deref());
    context.results_mut().add_schema(catalog, schema, true)
}

pub(crate) fn column_from_row(
    context: &mut InspectionContext<'_>,
    table: ObjectId,
    row: &Row,
    label: &str,
) -> Result<ObjectId> {
    let name = context.identifier(&required(row, label)?);
    Ok(context.results_mut().add_column(table, name))
}

/// 1-based position column as a map key.
pub(crate) fn position(row: &Row, label: &str, next: usize) -> i32 {
    row.int(label)
        .and_then(|value| i32::try_from(value).ok())
        .unwrap_or_else(|| i32::try_from(next + 1).unwrap_or(i32::MAX))
}

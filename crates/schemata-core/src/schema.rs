use schemars::JsonSchema;
use serde::Serialize;

use crate::graph::ObjectId;
use crate::identifier::Identifier;
use crate::types::{ColumnType, DatabaseInfo, DriverInfo, TableKind, UserDefinedTypeKind};

/// Root of the graph. There is at most one per inspection.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct Database {
    pub info: Option<DatabaseInfo>,
    pub driver: Option<DriverInfo>,
    pub catalogs: Vec<ObjectId>,
}

/// A catalog. Products without catalogs get a single unnamed one.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Catalog {
    pub name: Option<Identifier>,
    pub database: ObjectId,
    pub schemas: Vec<ObjectId>,
}

/// A schema. Products without schemas get a single unnamed one per catalog.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Schema {
    pub name: Option<Identifier>,
    pub catalog: ObjectId,
    pub tables: Vec<ObjectId>,
    pub sequences: Vec<ObjectId>,
    pub user_defined_types: Vec<ObjectId>,
}

/// A table-like object and the objects hanging off it.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Table {
    pub name: Identifier,
    pub schema: ObjectId,
    pub kind: TableKind,
    pub comment: Option<String>,
    pub columns: Vec<ObjectId>,
    pub primary_key: Option<ObjectId>,
    pub indexes: Vec<ObjectId>,
    pub foreign_keys: Vec<ObjectId>,
    /// Foreign keys of other tables that reference this one. Not owned.
    pub exported_keys: Vec<ObjectId>,
    pub checks: Vec<ObjectId>,
    pub triggers: Vec<ObjectId>,
}

impl Table {
    /// Empty node named `name` in `schema`.
    pub fn new(name: Identifier, schema: ObjectId) -> Self {
        Self {
            name,
            schema,
            kind: TableKind::default(),
            comment: None,
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            exported_keys: Vec::new(),
            checks: Vec::new(),
            triggers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Column {
    pub name: Identifier,
    pub table: ObjectId,
    pub position: Option<i32>,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub auto_increment: bool,
    pub comment: Option<String>,
    /// Identity/auto-increment generator bound to this column.
    pub sequence: Option<ObjectId>,
    pub triggers: Vec<ObjectId>,
}

impl Column {
    /// Column of `table` with no type information yet.
    pub fn new(name: Identifier, table: ObjectId) -> Self {
        Self {
            name,
            table,
            position: None,
            column_type: ColumnType::default(),
            nullable: true,
            default_value: None,
            auto_increment: false,
            comment: None,
            sequence: None,
            triggers: Vec::new(),
        }
    }
}

/// A standalone sequence, or the generator behind an auto-increment column
/// when `column` is set.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Sequence {
    pub name: Option<Identifier>,
    pub schema: ObjectId,
    pub column: Option<ObjectId>,
    pub start_with: Option<i128>,
    pub last_value: Option<i128>,
    pub increment_by: Option<i128>,
    pub min_value: Option<i128>,
    pub max_value: Option<i128>,
    pub cycle: bool,
    pub cache: Option<i64>,
    pub temporary: bool,
}

impl Sequence {
    /// Sequence in `schema`, optionally backing `column`.
    pub fn new(name: Option<Identifier>, schema: ObjectId, column: Option<ObjectId>) -> Self {
        Self {
            name,
            schema,
            column,
            start_with: None,
            last_value: None,
            increment_by: None,
            min_value: None,
            max_value: None,
            cycle: false,
            cache: None,
            temporary: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UserDefinedType {
    pub name: Identifier,
    pub schema: ObjectId,
    pub kind: UserDefinedTypeKind,
    pub type_code: Option<i32>,
    pub base_type: Option<String>,
    /// Enum labels in declaration order.
    pub values: Vec<String>,
    pub definition: Option<String>,
}

impl UserDefinedType {
    /// Type named `name` in `schema`, with no kind details yet.
    pub fn new(name: Identifier, schema: ObjectId) -> Self {
        Self {
            name,
            schema,
            kind: UserDefinedTypeKind::default(),
            type_code: None,
            base_type: None,
            values: Vec::new(),
            definition: None,
        }
    }
}

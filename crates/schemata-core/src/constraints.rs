use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::Serialize;

use crate::graph::ObjectId;
use crate::identifier::Identifier;
use crate::types::{Deferrability, ReferentialAction, SortOrder, TriggerEvent, TriggerTiming};

/// Primary key; columns keyed by their 1-based position in the key.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PrimaryKey {
    pub name: Option<Identifier>,
    pub table: ObjectId,
    pub columns: BTreeMap<i32, ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ForeignKeyReference {
    pub foreign_column: ObjectId,
    pub primary_column: ObjectId,
}

/// Foreign key owned by `foreign_table`. `primary_table` is a plain reference
/// and may live in another schema or catalog.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ForeignKey {
    pub name: Option<Identifier>,
    pub foreign_table: ObjectId,
    pub primary_table: ObjectId,
    pub references: BTreeMap<i32, ForeignKeyReference>,
    pub update_action: ReferentialAction,
    pub delete_action: ReferentialAction,
    pub deferrability: Deferrability,
}

impl ForeignKey {
    /// Key from `foreign_table` to `primary_table` without references yet.
    pub fn new(name: Option<Identifier>, foreign_table: ObjectId, primary_table: ObjectId) -> Self {
        Self {
            name,
            foreign_table,
            primary_table,
            references: BTreeMap::new(),
            update_action: ReferentialAction::default(),
            delete_action: ReferentialAction::default(),
            deferrability: Deferrability::default(),
        }
    }
}

/// One index key part: a column or an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct IndexColumn {
    pub column: Option<ObjectId>,
    pub expression: Option<String>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Index {
    pub name: Option<Identifier>,
    pub table: ObjectId,
    pub unique: bool,
    pub columns: BTreeMap<i32, IndexColumn>,
    pub filter_condition: Option<String>,
    pub index_type: Option<String>,
    pub definition: Option<String>,
}

impl Index {
    /// Index on `table` without columns yet.
    pub fn new(name: Option<Identifier>, table: ObjectId) -> Self {
        Self {
            name,
            table,
            unique: false,
            columns: BTreeMap::new(),
            filter_condition: None,
            index_type: None,
            definition: None,
        }
    }
}

/// Check constraint, optionally attached to a single column.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Check {
    pub name: Option<Identifier>,
    pub table: ObjectId,
    pub column: Option<ObjectId>,
    pub text: String,
}

/// Table trigger, or a column trigger when `column` is set.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Trigger {
    pub name: Identifier,
    pub table: ObjectId,
    pub column: Option<ObjectId>,
    pub timing: Option<TriggerTiming>,
    pub events: Vec<TriggerEvent>,
    pub for_each_row: bool,
    pub body: Option<String>,
    pub active: bool,
}

impl Trigger {
    /// Trigger on `table`, or on one of its columns.
    pub fn new(name: Identifier, table: ObjectId, column: Option<ObjectId>) -> Self {
        Self {
            name,
            table,
            column,
            timing: None,
            events: Vec::new(),
            for_each_row: true,
            body: None,
            active: true,
        }
    }
}

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kinds of metadata objects an inspection can produce.
///
/// Declaration order is the dependency order a run visits kinds in: every kind
/// comes after its parent kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Database,
    Catalog,
    Schema,
    UserDefinedType,
    Sequence,
    Table,
    Column,
    AutoIncrement,
    PrimaryKey,
    Index,
    Check,
    ForeignKey,
    Trigger,
    ColumnTrigger,
}

impl ObjectType {
    /// Every kind, in dependency order.
    pub const ALL: [ObjectType; 14] = [
        ObjectType::Database,
        ObjectType::Catalog,
        ObjectType::Schema,
        ObjectType::UserDefinedType,
        ObjectType::Sequence,
        ObjectType::Table,
        ObjectType::Column,
        ObjectType::AutoIncrement,
        ObjectType::PrimaryKey,
        ObjectType::Index,
        ObjectType::Check,
        ObjectType::ForeignKey,
        ObjectType::Trigger,
        ObjectType::ColumnTrigger,
    ];

    /// The kind whose discovered objects scope an inspection of this kind.
    pub fn parent(self) -> Option<ObjectType> {
        match self {
            ObjectType::Database => None,
            ObjectType::Catalog => Some(ObjectType::Database),
            ObjectType::Schema => Some(ObjectType::Catalog),
            ObjectType::UserDefinedType | ObjectType::Sequence | ObjectType::Table => {
                Some(ObjectType::Schema)
            }
            ObjectType::Column
            | ObjectType::PrimaryKey
            | ObjectType::Index
            | ObjectType::Check
            | ObjectType::ForeignKey
            | ObjectType::Trigger => Some(ObjectType::Table),
            ObjectType::AutoIncrement | ObjectType::ColumnTrigger => Some(ObjectType::Column),
        }
    }

    /// True when `ancestor` is reachable from this kind by following parents.
    pub fn is_descendant_of(self, ancestor: ObjectType) -> bool {
        let mut current = self.parent();
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Snake-case name, as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Database => "database",
            ObjectType::Catalog => "catalog",
            ObjectType::Schema => "schema",
            ObjectType::UserDefinedType => "user_defined_type",
            ObjectType::Sequence => "sequence",
            ObjectType::Table => "table",
            ObjectType::Column => "column",
            ObjectType::AutoIncrement => "auto_increment",
            ObjectType::PrimaryKey => "primary_key",
            ObjectType::Index => "index",
            ObjectType::Check => "check",
            ObjectType::ForeignKey => "foreign_key",
            ObjectType::Trigger => "trigger",
            ObjectType::ColumnTrigger => "column_trigger",
        }
    }

    /// Sort and deduplicate a requested kind set into dependency order.
    pub fn in_dependency_order(kinds: &[ObjectType]) -> Vec<ObjectType> {
        let mut ordered = kinds.to_vec();
        ordered.sort();
        ordered.dedup();
        ordered
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
        ObjectType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::Config(format!("unknown object type: {value}")))
    }
}

//! Core metadata model for schemata.
//!
//! This crate defines identifiers, object kinds, the node types of an
//! inspected database, and the arena graph that holds them. It performs no
//! I/O; the inspection engine lives in `schemata-inspect`.

pub mod constraints;
pub mod error;
pub mod graph;
pub mod identifier;
pub mod object_type;
pub mod redaction;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{Check, ForeignKey, ForeignKeyReference, Index, IndexColumn, PrimaryKey, Trigger};
pub use error::{Error, Result};
pub use graph::{ForeignKeyOrder, ForeignKeySummary, MetaData, MetaDataGraph, ObjectId};
pub use identifier::{Identifier, qualified_name};
pub use object_type::ObjectType;
pub use redaction::{RedactedConnection, redact_connection_string};
pub use schema::{Catalog, Column, Database, Schema, Sequence, Table, UserDefinedType};
pub use types::{
    ColumnType, DatabaseInfo, Deferrability, DriverInfo, ReferentialAction, SortOrder, TableKind,
    TriggerEvent, TriggerTiming, UserDefinedTypeKind, type_codes,
};
pub use validation::validate_graph;

/// Version of the serialized graph layout.
pub const GRAPH_FORMAT_VERSION: &str = "0.1";

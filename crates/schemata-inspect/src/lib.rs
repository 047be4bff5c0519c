//! Metadata inspection engine.
//!
//! An [`InspectionManager`] drives one inspector per object kind over a live
//! [`Connection`], merging everything found into an [`InspectionResults`]
//! graph. Inspectors are resolved per database product, falling back to
//! generic ones built on driver metadata calls and `information_schema`.

pub mod connection;
pub mod context;
pub mod db2;
pub mod dialect;
pub mod generic;
pub mod inspector;
pub mod manager;
pub mod mssql;
pub mod mysql;
pub mod options;
pub mod oracle;
pub mod postgres;
pub mod registry;
pub mod resolver;
pub mod results;
pub mod scope;

pub use connection::{Connection, MetaDataRequest, Row, Statement, Value};
pub use context::InspectionContext;
pub use dialect::{Dialect, DialectResolver, GenericDialect, IdentifierCase, IdentifierQuoting};
pub use inspector::{
    InspectionQuery, Inspector, Query, QueryInspector, Source, UnsupportedInspector,
    query_inspector,
};
pub use manager::InspectionManager;
pub use options::InspectOptions;
pub use postgres::PostgresConnection;
pub use registry::ProductRegistry;
pub use resolver::InspectorResolver;
pub use results::InspectionResults;
pub use scope::InspectionScope;

pub use schemata_core::{DatabaseInfo, Error, MetaDataGraph, ObjectId, ObjectType, Result};

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use schemata_core::{DriverInfo, Identifier};
use schemata_inspect::connection::labels;
use schemata_inspect::{
    Connection, DatabaseInfo, Error, InspectionResults, MetaDataRequest, ObjectId, ObjectType,
    Result, Row, Statement, Value,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connection answering from scripted rows and recording every statement.
///
/// Metadata answers are keyed by request kind and narrowed to the requested
/// table. Query answers are keyed by a fragment of the SQL text and narrowed
/// to rows whose `TABLE_NAME` is among the bound text parameters, if any.
#[derive(Debug)]
pub struct MockConnection {
    info: DatabaseInfo,
    metadata: HashMap<&'static str, Vec<Row>>,
    queries: Vec<(String, Vec<Row>)>,
    failing: Vec<String>,
    next_statement: u64,
    open: BTreeSet<u64>,
    pub prepared: Vec<String>,
    pub executed: Vec<(String, Vec<Value>)>,
    pub closed: Vec<u64>,
    pub peak_open: usize,
    pub metadata_calls: Vec<MetaDataRequest>,
    pub commits: usize,
    pub auto_commit: bool,
}

impl MockConnection {
    pub fn new(info: DatabaseInfo) -> Self {
        Self {
            info,
            metadata: HashMap::new(),
            queries: Vec::new(),
            failing: Vec::new(),
            next_statement: 0,
            open: BTreeSet::new(),
            prepared: Vec::new(),
            executed: Vec::new(),
            closed: Vec::new(),
            peak_open: 0,
            metadata_calls: Vec::new(),
            commits: 0,
            auto_commit: true,
        }
    }

    /// Rows returned for metadata requests named `request` (see
    /// [`MetaDataRequest::name`]).
    pub fn with_metadata(mut self, request: &'static str, rows: Vec<Row>) -> Self {
        self.metadata.entry(request).or_default().extend(rows);
        self
    }

    /// Rows returned by statements whose SQL contains `fragment`.
    pub fn with_query(mut self, fragment: &str, rows: Vec<Row>) -> Self {
        self.queries.push((fragment.to_string(), rows));
        self
    }

    /// Make executing statements whose SQL contains `fragment` fail.
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    pub fn open_statements(&self) -> usize {
        self.open.len()
    }

    pub fn prepared_matching(&self, fragment: &str) -> usize {
        self.prepared.iter().filter(|sql| sql.contains(fragment)).count()
    }

    pub fn executed_matching(&self, fragment: &str) -> usize {
        self.executed
            .iter()
            .filter(|(sql, _)| sql.contains(fragment))
            .count()
    }
}

fn requested_table(request: &MetaDataRequest) -> Option<&str> {
    match request {
        MetaDataRequest::Tables { table, .. }
        | MetaDataRequest::Columns { table, .. }
        | MetaDataRequest::PrimaryKeys { table, .. }
        | MetaDataRequest::ImportedKeys { table, .. }
        | MetaDataRequest::IndexInfo { table, .. } => table.as_deref(),
        _ => None,
    }
}

fn row_table(row: &Row) -> Option<String> {
    row.string(labels::TABLE_NAME)
        .or_else(|| row.string(labels::FKTABLE_NAME))
}

#[async_trait]
impl Connection for MockConnection {
    async fn database_info(&mut self) -> Result<DatabaseInfo> {
        Ok(self.info.clone())
    }

    async fn driver_info(&mut self) -> Result<DriverInfo> {
        Ok(DriverInfo {
            name: "mock".to_string(),
            version: Some("1".to_string()),
        })
    }

    async fn metadata(&mut self, request: &MetaDataRequest) -> Result<Vec<Row>> {
        self.metadata_calls.push(request.clone());
        let rows = self.metadata.get(request.name()).cloned().unwrap_or_default();
        let Some(table) = requested_table(request) else {
            return Ok(rows);
        };
        Ok(rows
            .into_iter()
            .filter(|row| row_table(row).is_none_or(|name| name.eq_ignore_ascii_case(table)))
            .collect())
    }

    async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        self.next_statement += 1;
        self.open.insert(self.next_statement);
        self.peak_open = self.peak_open.max(self.open.len());
        self.prepared.push(sql.to_string());
        Ok(Statement::new(self.next_statement, sql))
    }

    async fn execute(&mut self, statement: &Statement, params: &[Value]) -> Result<Vec<Row>> {
        if !self.open.contains(&statement.id()) {
            return Err(Error::query(statement.sql(), "statement is closed"));
        }
        self.executed.push((statement.sql().to_string(), params.to_vec()));
        if self.failing.iter().any(|fragment| statement.sql().contains(fragment)) {
            return Err(Error::query(statement.sql(), "scripted failure"));
        }
        let names: Vec<&str> = params.iter().filter_map(Value::as_str).collect();
        let rows = self
            .queries
            .iter()
            .filter(|(fragment, _)| statement.sql().contains(fragment.as_str()))
            .flat_map(|(_, rows)| rows.iter().cloned())
            .filter(|row| match row.string(labels::TABLE_NAME) {
                Some(table) if !names.is_empty() => {
                    names.iter().any(|name| name.eq_ignore_ascii_case(&table))
                }
                _ => true,
            })
            .collect();
        Ok(rows)
    }

    async fn close_statement(&mut self, statement: &Statement) -> Result<()> {
        self.open.remove(&statement.id());
        self.closed.push(statement.id());
        Ok(())
    }

    fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    async fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}

/// `catalog.schema.table` rows for the driver's table listing.
pub fn table_row(catalog: Option<&str>, schema: Option<&str>, table: &str) -> Row {
    let mut row = Row::new();
    if let Some(catalog) = catalog {
        row.push(labels::TABLE_CAT, catalog);
    }
    if let Some(schema) = schema {
        row.push(labels::TABLE_SCHEM, schema);
    }
    row.with(labels::TABLE_NAME, table)
        .with(labels::TABLE_TYPE, "TABLE")
}

pub fn column_row(
    catalog: Option<&str>,
    schema: Option<&str>,
    table: &str,
    column: &str,
    position: i64,
) -> Row {
    let mut row = Row::new();
    if let Some(catalog) = catalog {
        row.push(labels::TABLE_CAT, catalog);
    }
    if let Some(schema) = schema {
        row.push(labels::TABLE_SCHEM, schema);
    }
    row.with(labels::TABLE_NAME, table)
        .with(labels::COLUMN_NAME, column)
        .with(labels::DATA_TYPE, 4)
        .with(labels::TYPE_NAME, "INTEGER")
        .with(labels::NULLABLE, 0)
        .with(labels::ORDINAL_POSITION, position)
}

/// Discovered table named `name`, compared without case.
pub fn table_named(results: &InspectionResults, name: &str) -> Option<ObjectId> {
    find_named(results, ObjectType::Table, name)
}

pub fn find_named(results: &InspectionResults, kind: ObjectType, name: &str) -> Option<ObjectId> {
    let graph = results.graph();
    graph.ids_of(kind).into_iter().find(|id| {
        graph
            .get(*id)
            .and_then(|node| node.name())
            .is_some_and(|found: &Identifier| found.value().eq_ignore_ascii_case(name))
    })
}

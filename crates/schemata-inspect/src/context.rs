use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use schemata_core::{DatabaseInfo, Identifier, Result};

use crate::connection::{Connection, MetaDataRequest, Row, Statement, Value};
use crate::dialect::{Dialect, DialectResolver};
use crate::inspector::{Query, Source};
use crate::options::InspectOptions;
use crate::results::InspectionResults;

/// Attribute holding the resolved statement budget of a run.
pub const MAX_OPEN_CURSORS: &str = "max_open_cursors";

/// Open statements keyed by query text, remembered in open order.
#[derive(Debug, Default)]
struct StatementPool {
    open: HashMap<String, Statement>,
    order: VecDeque<String>,
}

impl StatementPool {
    fn get(&self, sql: &str) -> Option<&Statement> {
        self.open.get(sql)
    }

    fn insert(&mut self, sql: String, statement: Statement) {
        self.order.push_back(sql.clone());
        self.open.insert(sql, statement);
    }

    fn pop_oldest(&mut self) -> Option<Statement> {
        let sql = self.order.pop_front()?;
        self.open.remove(&sql)
    }

    fn remove(&mut self, sql: &str) -> Option<Statement> {
        self.order.retain(|open| open != sql);
        self.open.remove(sql)
    }

    fn drain(&mut self) -> Vec<Statement> {
        let mut statements = Vec::with_capacity(self.order.len());
        while let Some(statement) = self.pop_oldest() {
            statements.push(statement);
        }
        statements
    }

    fn len(&self) -> usize {
        self.open.len()
    }
}

/// State of one inspection run.
///
/// Wraps the caller's connection and accumulator, the resolved dialect, an
/// attribute bag shared by inspectors, and the pool of open statements. The
/// pool never holds more statements than the run's budget: opening one more
/// closes the statement opened earliest.
pub struct InspectionContext<'a> {
    connection: &'a mut dyn Connection,
    results: &'a mut InspectionResults,
    dialect: Arc<dyn Dialect>,
    database_info: DatabaseInfo,
    options: InspectOptions,
    attributes: HashMap<String, Value>,
    statements: StatementPool,
}

impl<'a> InspectionContext<'a> {
    /// Detect the database product and resolve its dialect.
    pub async fn open(
        connection: &'a mut dyn Connection,
        results: &'a mut InspectionResults,
        dialects: &DialectResolver,
        options: InspectOptions,
    ) -> Result<Self> {
        let database_info = connection.database_info().await?;
        let dialect = dialects.resolve(&database_info);
        debug!(
            product = %database_info,
            dialect = dialect.name(),
            "inspection context opened"
        );
        Ok(Self::new(connection, results, dialect, database_info, options))
    }

    /// Context over an already resolved dialect and product.
    pub fn new(
        connection: &'a mut dyn Connection,
        results: &'a mut InspectionResults,
        dialect: Arc<dyn Dialect>,
        database_info: DatabaseInfo,
        options: InspectOptions,
    ) -> Self {
        Self {
            connection,
            results,
            dialect,
            database_info,
            options,
            attributes: HashMap::new(),
            statements: StatementPool::default(),
        }
    }

    /// The live connection for this run.
    pub fn connection(&mut self) -> &mut dyn Connection {
        &mut *self.connection
    }

    /// Objects merged so far.
    pub fn results(&self) -> &InspectionResults {
        &*self.results
    }

    /// Mutable access to the merged objects.
    pub fn results_mut(&mut self) -> &mut InspectionResults {
        &mut *self.results
    }

    /// Dialect resolved for the connected product.
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Product and version of the connected database.
    pub fn database_info(&self) -> &DatabaseInfo {
        &self.database_info
    }

    /// Options for this run.
    pub fn options(&self) -> &InspectOptions {
        &self.options
    }

    /// Identifier for a name read from the database, per the run's quoting.
    pub fn identifier(&self, name: &str) -> Identifier {
        self.dialect.identifier(name, self.options.identifier_quoting)
    }

    /// [`InspectionContext::identifier`] for nullable names.
    pub fn optional_identifier(&self, name: Option<&str>) -> Option<Identifier> {
        name.map(|name| self.identifier(name))
    }

    /// Whether objects in `schema` (or catalog) are left out of the run.
    pub fn is_excluded_schema(&self, schema: Option<&str>) -> bool {
        !self.options.include_system_schemas
            && schema.is_some_and(|name| self.dialect.is_system_schema(name))
    }

    /// Run attribute shared between inspectors.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Store a run attribute, replacing any previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Statement budget of the run, resolved once and kept as an attribute.
    /// `0` means unlimited.
    pub async fn max_open_cursors(&mut self) -> Result<usize> {
        if let Some(limit) = self.attribute(MAX_OPEN_CURSORS).and_then(Value::as_i64) {
            return Ok(usize::try_from(limit).unwrap_or(0));
        }
        let limit = match self.options.max_open_cursors {
            Some(limit) if limit > 0 => limit,
            _ => {
                let dialect = Arc::clone(&self.dialect);
                dialect.max_open_cursors(&mut *self.connection).await?
            }
        };
        debug!(limit, "statement budget resolved");
        self.set_attribute(MAX_OPEN_CURSORS, i64::try_from(limit).unwrap_or(i64::MAX));
        Ok(limit)
    }

    /// Open statement for `sql`, reusing the one already open for the same
    /// text. Closes the oldest open statements first when at the budget.
    pub async fn create_statement(&mut self, sql: &str) -> Result<Statement> {
        if let Some(statement) = self.statements.get(sql) {
            trace!(statement = statement.id(), "reusing open statement");
            return Ok(statement.clone());
        }

        let limit = self.max_open_cursors().await?;
        if limit > 0 {
            while self.statements.len() >= limit {
                let Some(oldest) = self.statements.pop_oldest() else {
                    break;
                };
                trace!(statement = oldest.id(), limit, "evicting oldest open statement");
                self.close_quietly(&oldest).await;
            }
        }

        let statement = self.connection.prepare(sql).await?;
        trace!(
            statement = statement.id(),
            open = self.statements.len() + 1,
            "opened statement"
        );
        self.statements.insert(sql.to_string(), statement.clone());
        Ok(statement)
    }

    /// Currently open statement for `sql`, if any.
    pub fn open_statement(&self, sql: &str) -> Option<&Statement> {
        self.statements.get(sql)
    }

    /// Statements currently held open by the budget.
    pub fn open_statements(&self) -> usize {
        self.statements.len()
    }

    /// Close the statement open for `sql`, ignoring close failures.
    pub async fn close_statement(&mut self, sql: &str) {
        if let Some(statement) = self.statements.remove(sql) {
            self.close_quietly(&statement).await;
        }
    }

    /// Run `statement` with positional `params`.
    pub async fn execute(&mut self, statement: &Statement, params: &[Value]) -> Result<Vec<Row>> {
        self.connection.execute(statement, params).await
    }

    /// Prepare, run and close a statement outside the budget.
    pub async fn execute_direct(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let statement = self.connection.prepare(sql).await?;
        let rows = self.connection.execute(&statement, params).await;
        self.close_quietly(&statement).await;
        rows
    }

    /// Run a query through the budget or directly, per the run's options.
    pub async fn query(&mut self, query: &Query) -> Result<Vec<Row>> {
        if self.options.managed_statements {
            let statement = self.create_statement(&query.sql).await?;
            self.execute(&statement, &query.params).await
        } else {
            self.execute_direct(&query.sql, &query.params).await
        }
    }

    /// Answer a driver metadata request.
    pub async fn metadata(&mut self, request: &MetaDataRequest) -> Result<Vec<Row>> {
        trace!(request = request.name(), "driver metadata call");
        self.connection.metadata(request).await
    }

    /// Rows for `source`, through the statement budget when managed.
    pub async fn fetch(&mut self, source: &Source) -> Result<Vec<Row>> {
        match source {
            Source::Query(query) => self.query(query).await,
            Source::MetaData(request) => self.metadata(request).await,
        }
    }

    /// Close every open statement and commit unless in auto-commit mode.
    pub async fn close(mut self) -> Result<()> {
        for statement in self.statements.drain() {
            self.close_quietly(&statement).await;
        }
        if !self.connection.is_auto_commit() {
            debug!("committing inspection transaction");
            self.connection.commit().await?;
        }
        Ok(())
    }

    async fn close_quietly(&mut self, statement: &Statement) {
        if let Err(err) = self.connection.close_statement(statement).await {
            warn!(statement = statement.id(), error = %err, "failed to close statement");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_evicts_in_open_order() {
        let mut pool = StatementPool::default();
        pool.insert("a".into(), Statement::new(1, "a"));
        pool.insert("b".into(), Statement::new(2, "b"));
        pool.insert("c".into(), Statement::new(3, "c"));
        assert!(pool.get("a").is_some());

        assert_eq!(pool.pop_oldest().map(|s| s.id()), Some(1));
        assert_eq!(pool.remove("c").map(|s| s.id()), Some(3));
        assert_eq!(pool.len(), 1);
        let remaining: Vec<u64> = pool.drain().iter().map(Statement::id).collect();
        assert_eq!(remaining, vec![2]);
        assert_eq!(pool.len(), 0);
    }
}

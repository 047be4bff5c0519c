//! The unit of inspection work and the query-driven template most
//! strategies are built from.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use schemata_core::{MetaData, ObjectId, ObjectType, Result};

use crate::connection::{MetaDataRequest, Row, Value};
use crate::context::InspectionContext;
use crate::dialect::Dialect;
use crate::scope::InspectionScope;

/// Inspects one kind of object and merges what it finds into the run's
/// results.
///
/// Only [`Inspector::inspect_scope`] is required. The other entry points
/// default to it: whole-database inspection uses the unrestricted scope when
/// supported and otherwise walks the parent objects already discovered.
#[async_trait]
pub trait Inspector: Send + Sync {
    fn object_type(&self) -> ObjectType;

    /// Kind whose discovered objects seed whole-database inspection.
    fn parent_object_type(&self) -> Option<ObjectType> {
        self.object_type().parent()
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, _scope: &InspectionScope) -> bool {
        true
    }

    /// Inspect every object of this kind.
    async fn inspect(&self, context: &mut InspectionContext<'_>) -> Result<()> {
        let scope = InspectionScope::all();
        if self.supports_scope(context, &scope) {
            return self.inspect_scope(context, &scope).await;
        }
        let Some(parent) = self.parent_object_type() else {
            debug!(kind = %self.object_type(), "no unrestricted scope and no parent kind");
            return Ok(());
        };
        let parents = context.results().get_objects(parent).to_vec();
        if parents.is_empty() {
            debug!(kind = %self.object_type(), parent = %parent, "no parent objects to inspect");
            return Ok(());
        }
        self.inspect_objects(context, &parents).await
    }

    async fn inspect_scope(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
    ) -> Result<()>;

    /// Inspect several scopes in order.
    async fn inspect_scopes(
        &self,
        context: &mut InspectionContext<'_>,
        scopes: &[InspectionScope],
    ) -> Result<()> {
        for scope in scopes {
            self.inspect_scope(context, scope).await?;
        }
        Ok(())
    }

    /// Inspect the objects of this kind under objects already in the graph.
    async fn inspect_objects(
        &self,
        context: &mut InspectionContext<'_>,
        objects: &[ObjectId],
    ) -> Result<()> {
        let scopes = object_scopes(self, context, objects);
        if scopes.is_empty() {
            debug!(kind = %self.object_type(), "no supported scope for requested objects");
            return Ok(());
        }
        self.inspect_scopes(context, &scopes).await
    }
}

/// Scopes covering `objects`. An object whose own scope the inspector
/// cannot handle is replaced by the discovered parent-kind objects under it.
fn object_scopes<I: Inspector + ?Sized>(
    inspector: &I,
    context: &InspectionContext<'_>,
    objects: &[ObjectId],
) -> Vec<InspectionScope> {
    let graph = context.results().graph();
    let mut scopes: Vec<InspectionScope> = Vec::new();
    let mut push = |scope: InspectionScope| {
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    };

    for &object in objects {
        let scope = InspectionScope::for_object(graph, object);
        if inspector.supports_scope(context, &scope) {
            push(scope);
            continue;
        }
        let (Some(parent), Some(kind)) = (
            inspector.parent_object_type(),
            graph.get(object).map(MetaData::object_type),
        ) else {
            continue;
        };
        for &candidate in context.results().get_objects(parent) {
            if graph.ancestor(candidate, kind) != Some(object) {
                continue;
            }
            let scope = InspectionScope::for_object(graph, candidate);
            if inspector.supports_scope(context, &scope) {
                push(scope);
            }
        }
    }
    scopes
}

/// Inspector for a kind a product does not have.
///
/// Registering it for a product keeps the generic inspector, whose queries
/// that product cannot answer, from being resolved.
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedInspector(pub ObjectType);

#[async_trait]
impl Inspector for UnsupportedInspector {
    fn object_type(&self) -> ObjectType {
        self.0
    }

    async fn inspect_scope(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
    ) -> Result<()> {
        debug!(
            kind = %self.0,
            product = %context.database_info(),
            "kind not available for product"
        );
        Ok(())
    }
}

/// A statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Query {
    /// Plain query without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Extend `base`, which must end inside a `WHERE` clause, with
    /// `AND column LIKE ?` for every restricted level, then append `suffix`.
    pub fn filtered(
        dialect: &dyn Dialect,
        base: &str,
        filters: &[(&str, Option<&str>)],
        suffix: &str,
    ) -> Self {
        let mut query = Query::new(base.trim_end());
        for (column, pattern) in filters {
            let Some(pattern) = pattern else {
                continue;
            };
            let marker = dialect.placeholder(query.params.len() + 1);
            query.sql.push_str(&format!(" AND {column} LIKE {marker}"));
            query.params.push(Value::from(*pattern));
        }
        if !suffix.is_empty() {
            query.sql.push(' ');
            query.sql.push_str(suffix.trim());
        }
        query
    }
}

/// Where the rows of one inspection pass come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Query(Query),
    MetaData(MetaDataRequest),
}

/// A query plus a row mapper: the usual shape of an inspection strategy.
///
/// Wrap implementations in [`QueryInspector`] to get an [`Inspector`].
pub trait InspectionQuery: Send + Sync {
    fn object_type(&self) -> ObjectType;

    fn parent_object_type(&self) -> Option<ObjectType> {
        self.object_type().parent()
    }

    fn supports_scope(&self, _context: &InspectionContext<'_>, _scope: &InspectionScope) -> bool {
        true
    }

    fn source(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> Source;

    fn process_row(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
        row: &Row,
    ) -> Result<()>;
}

/// Runs an [`InspectionQuery`] per scope and feeds every row to its mapper.
///
/// Queries go through the context, so textually identical queries across
/// scopes share one open statement.
#[derive(Debug, Clone)]
pub struct QueryInspector<Q> {
    query: Q,
}

impl<Q: InspectionQuery> QueryInspector<Q> {
    /// Inspector running `query` through the shared template.
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// The wrapped query strategy.
    pub fn query(&self) -> &Q {
        &self.query
    }
}

/// Shorthand for a shared [`QueryInspector`].
pub fn query_inspector<Q: InspectionQuery + 'static>(query: Q) -> Arc<dyn Inspector> {
    Arc::new(QueryInspector::new(query))
}

#[async_trait]
impl<Q: InspectionQuery> Inspector for QueryInspector<Q> {
    fn object_type(&self) -> ObjectType {
        self.query.object_type()
    }

    fn parent_object_type(&self) -> Option<ObjectType> {
        self.query.parent_object_type()
    }

    fn supports_scope(&self, context: &InspectionContext<'_>, scope: &InspectionScope) -> bool {
        self.query.supports_scope(context, scope)
    }

    async fn inspect_scope(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
    ) -> Result<()> {
        let source = self.query.source(context, scope);
        let rows = context.fetch(&source).await?;
        trace!(kind = %self.object_type(), rows = rows.len(), "merging rows");
        for row in &rows {
            self.query.process_row(context, scope, row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;
    use crate::postgres::PostgresDialect;

    #[test]
    fn filtered_query_binds_only_restricted_levels() {
        let query = Query::filtered(
            &GenericDialect,
            "SELECT 1 FROM t WHERE kind = 'C'",
            &[("schema_name", Some("APP")), ("table_name", None)],
            "ORDER BY 1",
        );
        assert_eq!(
            query.sql,
            "SELECT 1 FROM t WHERE kind = 'C' AND schema_name LIKE ? ORDER BY 1"
        );
        assert_eq!(query.params, vec![Value::from("APP")]);
    }

    #[test]
    fn filtered_query_numbers_placeholders() {
        let query = Query::filtered(
            &PostgresDialect,
            "SELECT 1 FROM t WHERE true",
            &[("a", Some("x")), ("b", Some("y"))],
            "",
        );
        assert_eq!(query.sql, "SELECT 1 FROM t WHERE true AND a LIKE $1 AND b LIKE $2");
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use schemata_core::{DatabaseInfo, ObjectId, ObjectType, Result};

use crate::connection::Connection;
use crate::context::InspectionContext;
use crate::dialect::DialectResolver;
use crate::inspector::Inspector;
use crate::options::InspectOptions;
use crate::resolver::InspectorResolver;
use crate::results::InspectionResults;
use crate::scope::InspectionScope;

/// What one run was asked to inspect.
enum Target<'t> {
    Database,
    Scope(&'t InspectionScope),
    Objects(&'t [ObjectId]),
}

impl Target<'_> {
    fn label(&self) -> &'static str {
        match self {
            Target::Database => "database",
            Target::Scope(_) => "scope",
            Target::Objects(_) => "objects",
        }
    }
}

/// Entry point of the engine: one resolver per object kind plus the dialect
/// registry.
///
/// A run opens an [`InspectionContext`] over the caller's connection, visits
/// the requested kinds in dependency order and always closes the context
/// before returning. The first failing statement aborts the run.
#[derive(Debug)]
pub struct InspectionManager {
    resolvers: BTreeMap<ObjectType, InspectorResolver>,
    dialects: DialectResolver,
    options: InspectOptions,
}

impl InspectionManager {
    /// Manager without any inspector registered.
    pub fn new() -> Self {
        Self {
            resolvers: BTreeMap::new(),
            dialects: DialectResolver::with_defaults(),
            options: InspectOptions::default(),
        }
    }

    /// Manager with the generic inspectors and every built-in product
    /// strategy registered.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        crate::generic::register(&mut manager);
        crate::postgres::register(&mut manager);
        crate::mysql::register(&mut manager);
        crate::mssql::register(&mut manager);
        crate::oracle::register(&mut manager);
        crate::db2::register(&mut manager);
        manager
    }

    /// Replace the options used by every run.
    pub fn with_options(mut self, options: InspectOptions) -> Self {
        self.options = options;
        self
    }

    /// Options applied to every run.
    pub fn options(&self) -> &InspectOptions {
        &self.options
    }

    /// Dialect registry, for adding or overriding products.
    pub fn dialects_mut(&mut self) -> &mut DialectResolver {
        &mut self.dialects
    }

    /// Install the inspector used for products without a dedicated one.
    pub fn set_generic(&mut self, inspector: Arc<dyn Inspector>) {
        let kind = inspector.object_type();
        self.resolvers
            .entry(kind)
            .or_insert_with(|| InspectorResolver::new(kind))
            .set_generic(inspector);
    }

    /// Install a product-specific inspector; `product` is a name prefix
    /// with an optional minimum version.
    pub fn register(&mut self, product: DatabaseInfo, inspector: Arc<dyn Inspector>) {
        let kind = inspector.object_type();
        debug!(kind = %kind, product = %product, "registering inspector");
        self.resolvers
            .entry(kind)
            .or_insert_with(|| InspectorResolver::new(kind))
            .register(product, inspector);
    }

    /// Resolver installed for `kind`, if any.
    pub fn resolver(&self, kind: ObjectType) -> Option<&InspectorResolver> {
        self.resolvers.get(&kind)
    }

    /// Inspect the whole database. An empty `kinds` means the kinds listed
    /// in the options.
    pub async fn inspect(
        &self,
        connection: &mut dyn Connection,
        kinds: &[ObjectType],
    ) -> Result<InspectionResults> {
        let mut results = InspectionResults::new();
        self.run(connection, &mut results, Target::Database, kinds).await?;
        Ok(results)
    }

    /// Inspect the objects inside `scope`.
    pub async fn inspect_scope(
        &self,
        connection: &mut dyn Connection,
        scope: &InspectionScope,
        kinds: &[ObjectType],
    ) -> Result<InspectionResults> {
        let mut results = InspectionResults::new();
        self.run(connection, &mut results, Target::Scope(scope), kinds).await?;
        Ok(results)
    }

    /// Inspect into an existing accumulator. Objects merged before a
    /// failure stay in `results`.
    pub async fn inspect_into(
        &self,
        connection: &mut dyn Connection,
        results: &mut InspectionResults,
        scope: Option<&InspectionScope>,
        kinds: &[ObjectType],
    ) -> Result<()> {
        let target = match scope {
            Some(scope) => Target::Scope(scope),
            None => Target::Database,
        };
        self.run(connection, results, target, kinds).await
    }

    /// Inspect the objects under `objects`, nodes already in `results`.
    pub async fn inspect_objects(
        &self,
        connection: &mut dyn Connection,
        results: &mut InspectionResults,
        objects: &[ObjectId],
        kinds: &[ObjectType],
    ) -> Result<()> {
        self.run(connection, results, Target::Objects(objects), kinds).await
    }

    async fn run(
        &self,
        connection: &mut dyn Connection,
        results: &mut InspectionResults,
        target: Target<'_>,
        kinds: &[ObjectType],
    ) -> Result<()> {
        let kinds = if kinds.is_empty() {
            ObjectType::in_dependency_order(&self.options.object_types)
        } else {
            ObjectType::in_dependency_order(kinds)
        };
        info!(
            event = "inspection_started",
            target = target.label(),
            kinds = kinds.len()
        );

        let mut context =
            InspectionContext::open(connection, results, &self.dialects, self.options.clone())
                .await?;
        let outcome = self.visit(&mut context, &target, &kinds).await;
        let open_statements = context.open_statements();
        let closed = context.close().await;

        match outcome.and(closed) {
            Ok(()) => {
                info!(
                    event = "inspection_finished",
                    target = target.label(),
                    open_statements
                );
                Ok(())
            }
            Err(err) => {
                warn!(event = "inspection_failed", target = target.label(), error = %err);
                Err(err)
            }
        }
    }

    async fn visit(
        &self,
        context: &mut InspectionContext<'_>,
        target: &Target<'_>,
        kinds: &[ObjectType],
    ) -> Result<()> {
        for &kind in kinds {
            let Some(inspector) = self.resolve(kind, context.database_info()) else {
                debug!(kind = %kind, "no inspector for kind");
                continue;
            };
            match target {
                Target::Database => inspector.inspect(context).await?,
                Target::Scope(scope) => {
                    if inspector.supports_scope(context, scope) {
                        inspector.inspect_scope(context, scope).await?;
                    } else {
                        debug!(kind = %kind, "scope unsupported, inspecting whole database");
                        inspector.inspect(context).await?;
                    }
                }
                Target::Objects(objects) => inspector.inspect_objects(context, objects).await?,
            }
        }
        Ok(())
    }

    fn resolve(&self, kind: ObjectType, info: &DatabaseInfo) -> Option<Arc<dyn Inspector>> {
        self.resolvers.get(&kind)?.resolve(info)
    }
}

impl Default for InspectionManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

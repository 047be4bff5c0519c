use async_trait::async_trait;
use tracing::debug;

use schemata_core::{ObjectType, Result};

use crate::connection::{MetaDataRequest, labels};
use crate::context::InspectionContext;
use crate::inspector::Inspector;
use crate::scope::InspectionScope;

/// Records product and driver details on the database node.
#[derive(Debug, Clone, Default)]
pub struct DatabaseInspector;

#[async_trait]
impl Inspector for DatabaseInspector {
    fn object_type(&self) -> ObjectType {
        ObjectType::Database
    }

    async fn inspect_scope(
        &self,
        context: &mut InspectionContext<'_>,
        _scope: &InspectionScope,
    ) -> Result<()> {
        let driver = context.connection().driver_info().await?;
        let info = context.database_info().clone();
        let results = context.results_mut();
        let database = results.add_database();
        if let Some(node) = results.graph_mut().database_mut(database) {
            node.info = Some(info);
            node.driver = Some(driver);
        }
        Ok(())
    }
}

/// Catalogs from the driver. Products without catalogs get one unnamed
/// catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogInspector;

#[async_trait]
impl Inspector for CatalogInspector {
    fn object_type(&self) -> ObjectType {
        ObjectType::Catalog
    }

    async fn inspect_scope(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
    ) -> Result<()> {
        let rows = context.metadata(&MetaDataRequest::Catalogs).await?;
        if rows.is_empty() && scope.catalog.is_none() {
            debug!("driver reports no catalogs, using an unnamed one");
            context.results_mut().add_catalog(None, true);
            return Ok(());
        }

        for row in &rows {
            let Some(name) = row.string(labels::TABLE_CAT) else {
                continue;
            };
            if !scope.matches_catalog(Some(&name)) || context.is_excluded_schema(Some(&name)) {
                continue;
            }
            let name = context.identifier(&name);
            context.results_mut().add_catalog(Some(name), true);
        }
        Ok(())
    }
}

/// Schemas from the driver. Products without schemas get one unnamed schema
/// per discovered catalog.
#[derive(Debug, Clone, Default)]
pub struct SchemaInspector;

#[async_trait]
impl Inspector for SchemaInspector {
    fn object_type(&self) -> ObjectType {
        ObjectType::Schema
    }

    async fn inspect_scope(
        &self,
        context: &mut InspectionContext<'_>,
        scope: &InspectionScope,
    ) -> Result<()> {
        let request = MetaDataRequest::Schemas {
            catalog: scope.catalog.clone(),
            schema: scope.schema.clone(),
        };
        let rows = context.metadata(&request).await?;
        if rows.is_empty() && scope.schema.is_none() {
            add_unnamed_schemas(context, scope);
            return Ok(());
        }

        for row in &rows {
            let Some(name) = row.string(labels::TABLE_SCHEM) else {
                continue;
            };
            let catalog = row.string(labels::TABLE_CATALOG);
            if !scope.matches_catalog(catalog.as_deref())
                || !scope.matches_schema(Some(&name))
                || context.is_excluded_schema(Some(&name))
                || context.is_excluded_schema(catalog.as_deref())
            {
                continue;
            }
            let catalog = context.optional_identifier(catalog.as_deref());
            let name = context.identifier(&name);
            context.results_mut().add_schema(catalog, Some(name), true);
        }
        Ok(())
    }
}

fn add_unnamed_schemas(context: &mut InspectionContext<'_>, scope: &InspectionScope) {
    let graph = context.results().graph();
    let catalogs: Vec<_> = context
        .results()
        .get_objects(ObjectType::Catalog)
        .iter()
        .filter_map(|id| graph.catalog(*id))
        .map(|catalog| catalog.name.clone())
        .filter(|name| scope.matches_catalog(name.as_ref().map(|name| name.value())))
        .collect();

    debug!(catalogs = catalogs.len(), "driver reports no schemas, using unnamed ones");
    let results = context.results_mut();
    if catalogs.is_empty() {
        results.add_schema(None, None, true);
    }
    for catalog in catalogs {
        results.add_schema(catalog, None, true);
    }
}

mod common;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use schemata_core::{ReferentialAction, TriggerEvent, TriggerTiming};
use schemata_inspect::connection::labels;
use schemata_inspect::{
    DatabaseInfo, DialectResolver, Error, GenericDialect, InspectOptions, InspectionContext,
    InspectionManager, InspectionResults, InspectionScope, MetaDataRequest, ObjectType, Row,
};

use common::{MockConnection, column_row, find_named, init_tracing, table_named, table_row};

fn derby() -> DatabaseInfo {
    DatabaseInfo::new("Apache Derby").with_version(10, 16)
}

fn postgres() -> DatabaseInfo {
    DatabaseInfo::new("PostgreSQL").with_version(16, 2)
}

fn derby_shop() -> MockConnection {
    MockConnection::new(derby())
        .with_metadata(
            "schemas",
            vec![Row::new().with(labels::TABLE_SCHEM, "APP")],
        )
        .with_metadata(
            "tables",
            vec![
                table_row(None, Some("APP"), "ORDERS"),
                table_row(None, Some("APP"), "CUSTOMERS"),
            ],
        )
        .with_metadata(
            "columns",
            vec![
                column_row(None, Some("APP"), "ORDERS", "ID", 1),
                column_row(None, Some("APP"), "ORDERS", "CUSTOMER_ID", 2),
                column_row(None, Some("APP"), "CUSTOMERS", "ID", 1),
            ],
        )
        .with_metadata(
            "primary_keys",
            vec![
                Row::new()
                    .with(labels::TABLE_SCHEM, "APP")
                    .with(labels::TABLE_NAME, "ORDERS")
                    .with(labels::COLUMN_NAME, "ID")
                    .with(labels::KEY_SEQ, 1)
                    .with(labels::PK_NAME, "PK_ORDERS"),
                Row::new()
                    .with(labels::TABLE_SCHEM, "APP")
                    .with(labels::TABLE_NAME, "CUSTOMERS")
                    .with(labels::COLUMN_NAME, "ID")
                    .with(labels::KEY_SEQ, 1),
            ],
        )
        .with_metadata(
            "imported_keys",
            vec![
                Row::new()
                    .with(labels::FKTABLE_SCHEM, "APP")
                    .with(labels::FKTABLE_NAME, "ORDERS")
                    .with(labels::FKCOLUMN_NAME, "CUSTOMER_ID")
                    .with(labels::PKTABLE_SCHEM, "APP")
                    .with(labels::PKTABLE_NAME, "CUSTOMERS")
                    .with(labels::PKCOLUMN_NAME, "ID")
                    .with(labels::FK_NAME, "FK_ORDERS_CUSTOMER")
                    .with(labels::KEY_SEQ, 1)
                    .with(labels::UPDATE_RULE, 3)
                    .with(labels::DELETE_RULE, 0),
            ],
        )
}

fn postgres_shop() -> MockConnection {
    MockConnection::new(postgres())
        .with_metadata(
            "tables",
            vec![
                table_row(Some("shop"), Some("public"), "orders"),
                table_row(Some("shop"), Some("public"), "customers"),
            ],
        )
        .with_query(
            "pg_constraint",
            vec![
                Row::new()
                    .with(labels::TABLE_CAT, "shop")
                    .with(labels::TABLE_SCHEM, "public")
                    .with(labels::TABLE_NAME, "orders")
                    .with(labels::CHECK_NAME, "orders_total_check")
                    .with(labels::CHECK_TEXT, "CHECK (total >= 0)")
                    .with(labels::COLUMN_NAME, "total"),
            ],
        )
}

#[tokio::test]
async fn repeated_runs_merge_into_one_identity_per_object() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = derby_shop();
    let kinds = [
        ObjectType::Catalog,
        ObjectType::Schema,
        ObjectType::Table,
        ObjectType::Column,
        ObjectType::PrimaryKey,
    ];

    let mut results = manager.inspect(&mut connection, &kinds).await?;
    manager
        .inspect_into(&mut connection, &mut results, None, &kinds)
        .await?;

    assert_eq!(results.get_objects(ObjectType::Catalog).len(), 1);
    assert_eq!(results.get_objects(ObjectType::Schema).len(), 1);
    assert_eq!(results.get_objects(ObjectType::Table).len(), 2);
    assert_eq!(results.get_objects(ObjectType::Column).len(), 3);
    assert_eq!(results.get_objects(ObjectType::PrimaryKey).len(), 2);

    let orders = table_named(&results, "orders").context("orders table")?;
    let schema = results.get_object(ObjectType::Schema).context("schema")?;
    let graph = results.graph();
    assert_eq!(graph.table(orders).map(|table| table.schema), Some(schema));
    assert_eq!(graph.qualified_name(orders), "APP.ORDERS");

    let key = graph
        .table(orders)
        .and_then(|table| table.primary_key)
        .context("orders primary key")?;
    let key = graph.primary_key(key).context("primary key node")?;
    assert_eq!(key.name.as_ref().map(|name| name.value()), Some("PK_ORDERS"));
    assert_eq!(key.columns.len(), 1);
    Ok(())
}

#[tokio::test]
async fn schema_scope_discovers_the_tables_it_owns() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = MockConnection::new(derby())
        .with_metadata("tables", vec![table_row(None, Some("APP"), "ORDERS")]);
    let scope = InspectionScope::all().with_schema("APP");

    let results = manager
        .inspect_scope(&mut connection, &scope, &[ObjectType::Table])
        .await?;

    let tables = results.get_objects(ObjectType::Table);
    assert_eq!(tables.len(), 1);
    let graph = results.graph();
    let orders = graph.table(tables[0]).context("orders node")?;
    assert_eq!(orders.name.value(), "ORDERS");
    let schema = graph.schema(orders.schema).context("owning schema")?;
    assert_eq!(schema.name.as_ref().map(|name| name.value()), Some("APP"));
    assert_eq!(graph.qualified_name(tables[0]), "APP.ORDERS");

    let request = connection
        .metadata_calls
        .iter()
        .find(|request| request.name() == "tables")
        .context("tables request")?;
    assert!(
        matches!(request, MetaDataRequest::Tables { schema: Some(schema), table: None, .. } if schema == "APP"),
        "{request:?}"
    );
    Ok(())
}

#[tokio::test]
async fn referenced_tables_outside_the_scope_are_not_registered() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = derby_shop();
    let scope = InspectionScope::all().with_schema("APP").with_table("ORDERS");

    let results = manager
        .inspect_scope(
            &mut connection,
            &scope,
            &[ObjectType::Table, ObjectType::Column, ObjectType::ForeignKey],
        )
        .await?;

    let orders = table_named(&results, "ORDERS").context("orders table")?;
    let customers = table_named(&results, "CUSTOMERS").context("customers node")?;
    assert_eq!(results.get_objects(ObjectType::Table), &[orders]);
    assert!(!results.is_registered(customers));

    let key = results
        .get_object(ObjectType::ForeignKey)
        .context("foreign key")?;
    let key = results.graph().foreign_key(key).context("foreign key node")?;
    assert_eq!(key.foreign_table, orders);
    assert_eq!(key.primary_table, customers);
    assert_eq!(key.delete_action, ReferentialAction::Cascade);
    assert_eq!(key.update_action, ReferentialAction::NoAction);

    let reference = key.references.get(&1).context("first reference")?;
    assert!(results.is_registered(reference.foreign_column));
    assert!(!results.is_registered(reference.primary_column));
    Ok(())
}

#[tokio::test]
async fn keys_into_other_schemas_keep_the_target_unregistered() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = MockConnection::new(derby())
        .with_metadata("tables", vec![table_row(None, Some("S2"), "CHILD")])
        .with_metadata(
            "columns",
            vec![
                column_row(None, Some("S2"), "CHILD", "ID", 1),
                column_row(None, Some("S2"), "CHILD", "PARENT_ID", 2),
            ],
        )
        .with_metadata(
            "imported_keys",
            vec![
                Row::new()
                    .with(labels::FKTABLE_SCHEM, "S2")
                    .with(labels::FKTABLE_NAME, "CHILD")
                    .with(labels::FKCOLUMN_NAME, "PARENT_ID")
                    .with(labels::PKTABLE_SCHEM, "S1")
                    .with(labels::PKTABLE_NAME, "PARENT")
                    .with(labels::PKCOLUMN_NAME, "ID")
                    .with(labels::FK_NAME, "FK_CHILD_PARENT")
                    .with(labels::KEY_SEQ, 1),
            ],
        );
    let scope = InspectionScope::all().with_schema("S2");

    let results = manager
        .inspect_scope(
            &mut connection,
            &scope,
            &[ObjectType::Table, ObjectType::Column, ObjectType::ForeignKey],
        )
        .await?;

    let child = table_named(&results, "CHILD").context("child table")?;
    let parent = table_named(&results, "PARENT").context("parent node")?;
    assert_eq!(results.get_objects(ObjectType::Table), &[child]);
    assert!(!results.is_registered(parent));

    let graph = results.graph();
    let key = results
        .get_object(ObjectType::ForeignKey)
        .and_then(|id| graph.foreign_key(id))
        .context("foreign key")?;
    assert_eq!(key.foreign_table, child);
    assert_eq!(key.primary_table, parent);
    assert_eq!(graph.qualified_name(parent), "S1.PARENT");

    let schemas = results.get_objects(ObjectType::Schema);
    assert_eq!(schemas.len(), 1);
    let schema = graph.schema(schemas[0]).context("registered schema")?;
    assert_eq!(schema.name.as_ref().map(|name| name.value()), Some("S2"));
    Ok(())
}

#[tokio::test]
async fn table_level_queries_walk_discovered_tables_with_one_statement() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = postgres_shop();

    let results = manager
        .inspect(&mut connection, &[ObjectType::Table, ObjectType::Check])
        .await?;

    assert_eq!(connection.prepared_matching("pg_constraint"), 1);
    assert_eq!(connection.executed_matching("pg_constraint"), 2);
    assert_eq!(connection.open_statements(), 0);

    let checks = results.get_objects(ObjectType::Check);
    assert_eq!(checks.len(), 1);
    let check = results.graph().check(checks[0]).context("check node")?;
    assert_eq!(Some(check.table), table_named(&results, "orders"));
    assert_eq!(check.text, "CHECK (total >= 0)");
    assert_eq!(
        check.column,
        find_named(&results, ObjectType::Column, "total")
    );
    Ok(())
}

#[tokio::test]
async fn table_level_queries_without_tables_do_nothing() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = MockConnection::new(postgres());

    let results = manager
        .inspect(&mut connection, &[ObjectType::Check, ObjectType::Trigger])
        .await?;

    assert!(connection.prepared.is_empty());
    assert!(results.graph().is_empty());
    Ok(())
}

#[tokio::test]
async fn supported_scopes_are_queried_directly() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = postgres_shop();
    let scope = InspectionScope::all()
        .with_schema("public")
        .with_table("orders");

    manager
        .inspect_scope(&mut connection, &scope, &[ObjectType::Check])
        .await?;

    let (sql, params) = connection
        .executed
        .first()
        .ok_or_else(|| anyhow!("no statement executed"))?;
    assert!(sql.contains("n.nspname LIKE $1"), "{sql}");
    assert!(sql.contains("c.relname LIKE $2"), "{sql}");
    assert_eq!(params.len(), 2);
    Ok(())
}

#[tokio::test]
async fn schema_only_scopes_fall_back_to_walking_tables() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = postgres_shop();
    let scope = InspectionScope::all().with_schema("public");

    let results = manager
        .inspect_scope(
            &mut connection,
            &scope,
            &[ObjectType::Table, ObjectType::Check],
        )
        .await?;

    assert_eq!(results.get_objects(ObjectType::Table).len(), 2);
    assert_eq!(connection.prepared_matching("pg_constraint"), 1);
    assert_eq!(connection.executed_matching("pg_constraint"), 2);

    let checks = results.get_objects(ObjectType::Check);
    assert_eq!(checks.len(), 1);
    let check = results.graph().check(checks[0]).context("check node")?;
    assert_eq!(Some(check.table), table_named(&results, "orders"));
    assert_eq!(check.name.as_ref().map(|name| name.value()), Some("orders_total_check"));
    Ok(())
}

#[tokio::test]
async fn failed_statement_aborts_the_run_and_closes_statements() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = postgres_shop().failing_on("pg_trigger");
    connection.auto_commit = false;
    let mut results = InspectionResults::new();
    let scope = InspectionScope::all()
        .with_schema("public")
        .with_table("orders");

    let outcome = manager
        .inspect_into(
            &mut connection,
            &mut results,
            Some(&scope),
            &[ObjectType::Table, ObjectType::Trigger],
        )
        .await;

    assert!(matches!(outcome, Err(Error::Query { .. })), "{outcome:?}");
    assert_eq!(connection.open_statements(), 0);
    assert_eq!(connection.commits, 1);
    assert!(table_named(&results, "orders").is_some());
    Ok(())
}

#[tokio::test]
async fn statement_budget_closes_the_oldest_statement_first() -> Result<()> {
    init_tracing();
    let mut connection = MockConnection::new(derby());
    let mut results = InspectionResults::new();
    let options = InspectOptions {
        max_open_cursors: Some(2),
        ..InspectOptions::default()
    };
    let mut context = InspectionContext::new(
        &mut connection,
        &mut results,
        Arc::new(GenericDialect),
        derby(),
        options,
    );

    let first = context.create_statement("SELECT 1 FROM SYSIBM.SYSDUMMY1").await?;
    let second = context.create_statement("SELECT 2 FROM SYSIBM.SYSDUMMY1").await?;
    let reused = context.create_statement("SELECT 1 FROM SYSIBM.SYSDUMMY1").await?;
    assert!(reused.same_as(&first));
    assert_eq!(context.open_statements(), 2);

    let third = context.create_statement("SELECT 3 FROM SYSIBM.SYSDUMMY1").await?;
    assert_eq!(context.open_statements(), 2);
    assert!(context.open_statement(first.sql()).is_none());
    assert!(context.open_statement(second.sql()).is_some());
    assert!(context.open_statement(third.sql()).is_some());
    context.close().await?;

    assert_eq!(connection.peak_open, 2);
    assert_eq!(connection.closed, vec![first.id(), second.id(), third.id()]);
    assert_eq!(connection.open_statements(), 0);
    Ok(())
}

#[tokio::test]
async fn unmanaged_statements_are_closed_after_each_query() -> Result<()> {
    init_tracing();
    let options = InspectOptions {
        managed_statements: false,
        ..InspectOptions::default()
    };
    let manager = InspectionManager::with_defaults().with_options(options);
    let mut connection = postgres_shop();

    manager
        .inspect(&mut connection, &[ObjectType::Table, ObjectType::Check])
        .await?;

    assert_eq!(connection.prepared_matching("pg_constraint"), 2);
    assert_eq!(connection.peak_open, 1);
    Ok(())
}

#[tokio::test]
async fn oracle_budget_comes_from_open_cursors() -> Result<()> {
    init_tracing();
    let dialects = DialectResolver::with_defaults();
    let mut connection = MockConnection::new(DatabaseInfo::new("Oracle").with_version(19, 0))
        .with_query("v$parameter", vec![Row::new().with("VALUE", "300")]);
    let mut results = InspectionResults::new();
    let mut context = InspectionContext::open(
        &mut connection,
        &mut results,
        &dialects,
        InspectOptions::default(),
    )
    .await?;

    assert_eq!(context.max_open_cursors().await?, 300);
    assert_eq!(context.max_open_cursors().await?, 300);
    context.close().await?;
    assert_eq!(connection.prepared_matching("v$parameter"), 1);
    assert_eq!(connection.open_statements(), 0);
    Ok(())
}

#[tokio::test]
async fn unreadable_open_cursors_falls_back_to_the_default() -> Result<()> {
    init_tracing();
    let dialects = DialectResolver::with_defaults();
    let mut connection =
        MockConnection::new(DatabaseInfo::new("Oracle").with_version(19, 0)).failing_on("v$parameter");
    let mut results = InspectionResults::new();
    let mut context = InspectionContext::open(
        &mut connection,
        &mut results,
        &dialects,
        InspectOptions::default(),
    )
    .await?;

    assert_eq!(
        context.max_open_cursors().await?,
        schemata_inspect::oracle::DEFAULT_OPEN_CURSORS
    );
    context.close().await?;
    assert_eq!(connection.open_statements(), 0);
    Ok(())
}

#[tokio::test]
async fn configured_budget_skips_the_dialect_lookup() -> Result<()> {
    init_tracing();
    let dialects = DialectResolver::with_defaults();
    let mut connection = MockConnection::new(DatabaseInfo::new("Oracle").with_version(19, 0));
    let mut results = InspectionResults::new();
    let options = InspectOptions {
        max_open_cursors: Some(5),
        ..InspectOptions::default()
    };
    let mut context =
        InspectionContext::open(&mut connection, &mut results, &dialects, options).await?;

    assert_eq!(context.max_open_cursors().await?, 5);
    context.close().await?;
    assert!(connection.prepared.is_empty());
    Ok(())
}

#[tokio::test]
async fn zero_configured_budget_defers_to_the_dialect() -> Result<()> {
    init_tracing();
    let dialects = DialectResolver::with_defaults();
    let mut connection = MockConnection::new(DatabaseInfo::new("Oracle").with_version(19, 0))
        .with_query("v$parameter", vec![Row::new().with("VALUE", "300")]);
    let mut results = InspectionResults::new();
    let options = InspectOptions {
        max_open_cursors: Some(0),
        ..InspectOptions::default()
    };
    let mut context =
        InspectionContext::open(&mut connection, &mut results, &dialects, options).await?;

    assert_eq!(context.max_open_cursors().await?, 300);
    context.close().await?;
    assert_eq!(connection.prepared_matching("v$parameter"), 1);
    Ok(())
}

#[tokio::test]
async fn mysql_on_update_columns_become_column_triggers() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = MockConnection::new(DatabaseInfo::new("MySQL").with_version(8, 0))
        .with_metadata("tables", vec![table_row(Some("shop"), None, "orders")])
        .with_query(
            "on update",
            vec![
                Row::new()
                    .with(labels::TABLE_CAT, "shop")
                    .with(labels::TABLE_NAME, "orders")
                    .with(labels::COLUMN_NAME, "updated_at")
                    .with(labels::TRIGGER_NAME, "ON UPDATE")
                    .with(labels::TRIGGER_TIMING, "BEFORE")
                    .with(labels::TRIGGER_EVENT, "UPDATE")
                    .with(labels::TRIGGER_LEVEL, "ROW")
                    .with(labels::TRIGGER_BODY, "on update CURRENT_TIMESTAMP"),
            ],
        );
    let scope = InspectionScope::all().with_catalog("shop").with_table("orders");

    let results = manager
        .inspect_scope(
            &mut connection,
            &scope,
            &[ObjectType::Table, ObjectType::ColumnTrigger],
        )
        .await?;

    let triggers = results.get_objects(ObjectType::ColumnTrigger);
    assert_eq!(triggers.len(), 1);
    assert!(results.get_objects(ObjectType::Trigger).is_empty());
    let trigger = results.graph().trigger(triggers[0]).context("trigger node")?;
    assert_eq!(
        trigger.column,
        find_named(&results, ObjectType::Column, "updated_at")
    );
    assert_eq!(trigger.timing, Some(TriggerTiming::Before));
    assert_eq!(trigger.events, vec![TriggerEvent::Update]);
    assert!(trigger.for_each_row);
    Ok(())
}

#[tokio::test]
async fn kinds_a_product_lacks_are_skipped_without_queries() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = MockConnection::new(DatabaseInfo::new("MySQL").with_version(5, 7))
        .with_metadata("tables", vec![table_row(Some("shop"), None, "orders")]);

    let results = manager
        .inspect(
            &mut connection,
            &[ObjectType::Table, ObjectType::Sequence, ObjectType::Check],
        )
        .await?;

    assert!(connection.prepared.is_empty());
    assert!(results.get_objects(ObjectType::Sequence).is_empty());
    assert!(results.get_objects(ObjectType::Check).is_empty());
    Ok(())
}

#[tokio::test]
async fn checks_are_read_once_the_product_supports_them() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = MockConnection::new(DatabaseInfo::new("MySQL").with_version(8, 0))
        .with_metadata("tables", vec![table_row(Some("shop"), None, "orders")]);

    manager
        .inspect(&mut connection, &[ObjectType::Table, ObjectType::Check])
        .await?;

    assert_eq!(connection.prepared_matching("CHECK_CONSTRAINTS"), 1);
    Ok(())
}

#[tokio::test]
async fn inspecting_objects_narrows_requests_to_them() -> Result<()> {
    init_tracing();
    let manager = InspectionManager::with_defaults();
    let mut connection = derby_shop();
    let mut results = manager.inspect(&mut connection, &[ObjectType::Table]).await?;
    let orders = table_named(&results, "ORDERS").context("orders table")?;

    manager
        .inspect_objects(&mut connection, &mut results, &[orders], &[ObjectType::Column])
        .await?;

    let request = connection
        .metadata_calls
        .last()
        .context("columns request")?;
    assert_eq!(request.name(), "columns");
    assert_eq!(results.get_objects(ObjectType::Column).len(), 2);
    let columns = results.graph().table(orders).map(|table| table.columns.len());
    assert_eq!(columns, Some(2));
    assert!(find_named(&results, ObjectType::Column, "CUSTOMER_ID").is_some());
    Ok(())
}

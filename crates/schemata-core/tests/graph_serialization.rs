use schemars::schema_for;
use schemata_core::{
    Catalog, Column, Database, DatabaseInfo, MetaData, MetaDataGraph, Schema, Table,
};

fn sample_graph() -> MetaDataGraph {
    let mut graph = MetaDataGraph::new();
    let database = graph.insert(MetaData::Database(Database {
        info: Some(DatabaseInfo::new("PostgreSQL").with_version(16, 2)),
        driver: None,
        catalogs: Vec::new(),
    }));
    let catalog = graph.insert(MetaData::Catalog(Catalog {
        name: Some("shop".into()),
        database,
        schemas: Vec::new(),
    }));
    let schema = graph.insert(MetaData::Schema(Schema {
        name: Some("app".into()),
        catalog,
        tables: Vec::new(),
        sequences: Vec::new(),
        user_defined_types: Vec::new(),
    }));
    let table = graph.insert(MetaData::Table(Table::new("orders".into(), schema)));
    graph.insert(MetaData::Column(Column::new("id".into(), table)));
    graph
}

#[test]
fn serializes_nodes_with_kind_tags_and_ids() {
    let json = serde_json::to_value(sample_graph()).expect("serialize graph");
    let nodes = json["nodes"].as_array().expect("nodes array");

    assert_eq!(nodes.len(), 5);
    assert_eq!(nodes[0]["kind"], "database");
    assert_eq!(nodes[0]["info"]["product_name"], "PostgreSQL");
    assert_eq!(nodes[2]["tables"], serde_json::json!([3]));
    assert_eq!(nodes[3]["kind"], "table");
    assert_eq!(nodes[3]["name"]["value"], "orders");
    assert_eq!(nodes[3]["columns"], serde_json::json!([4]));
    assert_eq!(nodes[4]["table"], 3);
}

#[test]
fn json_schema_describes_graph_nodes() {
    let generated = serde_json::to_value(schema_for!(MetaDataGraph)).expect("serialize schema");
    let definitions = generated["definitions"]
        .as_object()
        .expect("schema definitions");

    for name in ["MetaData", "Identifier", "DatabaseInfo"] {
        assert!(definitions.contains_key(name), "missing definition {name}");
    }
}

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::graph::{MetaData, MetaDataGraph};
use crate::identifier::qualified_name;

/// Validate internal consistency of a metadata graph.
///
/// This checks:
/// - no two live nodes of one kind share an identity path
/// - every owned child points back at the node listing it
/// - foreign keys reference live tables on both sides
pub fn validate_graph(graph: &MetaDataGraph) -> Result<()> {
    let mut seen = HashMap::new();
    for id in graph.ids() {
        let Some(node) = graph.get(id) else {
            continue;
        };
        let path = graph.path(id);
        if let Some(previous) = seen.insert((node.object_type(), path.clone()), id) {
            return Err(Error::InvalidSchema(format!(
                "duplicate {} {} (objects {} and {})",
                node.object_type(),
                qualified_name(&path),
                previous.index(),
                id.index()
            )));
        }

        for child in graph.children(id) {
            let owner = graph.get(child).and_then(MetaData::owner);
            if owner != Some(id) {
                return Err(Error::InvalidSchema(format!(
                    "{} lists child {} that is owned elsewhere",
                    graph.qualified_name(id),
                    child.index()
                )));
            }
        }

        if let MetaData::ForeignKey(fk) = node {
            for table in [fk.foreign_table, fk.primary_table] {
                if graph.table(table).is_none() {
                    return Err(Error::InvalidSchema(format!(
                        "foreign key {} references missing table {}",
                        graph.qualified_name(id),
                        table.index()
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Catalog, Database, Schema, Table};

    fn schema(graph: &mut MetaDataGraph) -> crate::graph::ObjectId {
        let database = graph.insert(MetaData::Database(Database::default()));
        let catalog = graph.insert(MetaData::Catalog(Catalog {
            name: Some("shop".into()),
            database,
            schemas: Vec::new(),
        }));
        graph.insert(MetaData::Schema(Schema {
            name: Some("app".into()),
            catalog,
            tables: Vec::new(),
            sequences: Vec::new(),
            user_defined_types: Vec::new(),
        }))
    }

    #[test]
    fn accepts_distinct_tables() {
        let mut graph = MetaDataGraph::new();
        let schema = schema(&mut graph);
        graph.insert(MetaData::Table(Table::new("orders".into(), schema)));
        graph.insert(MetaData::Table(Table::new("users".into(), schema)));
        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn rejects_duplicate_identity() {
        let mut graph = MetaDataGraph::new();
        let schema = schema(&mut graph);
        graph.insert(MetaData::Table(Table::new("orders".into(), schema)));
        graph.insert(MetaData::Table(Table::new("ORDERS".into(), schema)));

        let err = validate_graph(&graph).unwrap_err();
        assert!(err.to_string().contains("duplicate table shop.app"));
    }
}

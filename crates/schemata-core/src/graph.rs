use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::Serialize;

use crate::constraints::{Check, ForeignKey, Index, PrimaryKey, Trigger};
use crate::identifier::{Identifier, qualified_name};
use crate::object_type::ObjectType;
use crate::schema::{Catalog, Column, Database, Schema, Sequence, Table, UserDefinedType};

/// Handle of a node inside a [`MetaDataGraph`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node of the metadata graph.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetaData {
    Database(Database),
    Catalog(Catalog),
    Schema(Schema),
    Table(Table),
    Column(Column),
    PrimaryKey(PrimaryKey),
    ForeignKey(ForeignKey),
    Index(Index),
    Check(Check),
    Sequence(Sequence),
    Trigger(Trigger),
    UserDefinedType(UserDefinedType),
}

impl MetaData {
    /// Kind of this node.
    pub fn object_type(&self) -> ObjectType {
        match self {
            MetaData::Database(_) => ObjectType::Database,
            MetaData::Catalog(_) => ObjectType::Catalog,
            MetaData::Schema(_) => ObjectType::Schema,
            MetaData::Table(_) => ObjectType::Table,
            MetaData::Column(_) => ObjectType::Column,
            MetaData::PrimaryKey(_) => ObjectType::PrimaryKey,
            MetaData::ForeignKey(_) => ObjectType::ForeignKey,
            MetaData::Index(_) => ObjectType::Index,
            MetaData::Check(_) => ObjectType::Check,
            MetaData::Sequence(sequence) if sequence.column.is_some() => ObjectType::AutoIncrement,
            MetaData::Sequence(_) => ObjectType::Sequence,
            MetaData::Trigger(trigger) if trigger.column.is_some() => ObjectType::ColumnTrigger,
            MetaData::Trigger(_) => ObjectType::Trigger,
            MetaData::UserDefinedType(_) => ObjectType::UserDefinedType,
        }
    }

    /// Node name; unnamed nodes return `None`.
    pub fn name(&self) -> Option<&Identifier> {
        match self {
            MetaData::Database(_) => None,
            MetaData::Catalog(node) => node.name.as_ref(),
            MetaData::Schema(node) => node.name.as_ref(),
            MetaData::Table(node) => Some(&node.name),
            MetaData::Column(node) => Some(&node.name),
            MetaData::PrimaryKey(node) => node.name.as_ref(),
            MetaData::ForeignKey(node) => node.name.as_ref(),
            MetaData::Index(node) => node.name.as_ref(),
            MetaData::Check(node) => node.name.as_ref(),
            MetaData::Sequence(node) => node.name.as_ref(),
            MetaData::Trigger(node) => Some(&node.name),
            MetaData::UserDefinedType(node) => Some(&node.name),
        }
    }

    /// The node that owns this one in the catalog tree.
    pub fn owner(&self) -> Option<ObjectId> {
        match self {
            MetaData::Database(_) => None,
            MetaData::Catalog(node) => Some(node.database),
            MetaData::Schema(node) => Some(node.catalog),
            MetaData::Table(node) => Some(node.schema),
            MetaData::Column(node) => Some(node.table),
            MetaData::PrimaryKey(node) => Some(node.table),
            MetaData::ForeignKey(node) => Some(node.foreign_table),
            MetaData::Index(node) => Some(node.table),
            MetaData::Check(node) => Some(node.table),
            MetaData::Sequence(node) => Some(node.column.unwrap_or(node.schema)),
            MetaData::Trigger(node) => Some(node.column.unwrap_or(node.table)),
            MetaData::UserDefinedType(node) => Some(node.schema),
        }
    }

    fn links(&self) -> Vec<(ObjectId, Slot)> {
        match self {
            MetaData::Database(_) => Vec::new(),
            MetaData::Catalog(node) => vec![(node.database, Slot::Catalogs)],
            MetaData::Schema(node) => vec![(node.catalog, Slot::Schemas)],
            MetaData::Table(node) => vec![(node.schema, Slot::Tables)],
            MetaData::Column(node) => vec![(node.table, Slot::Columns)],
            MetaData::PrimaryKey(node) => vec![(node.table, Slot::PrimaryKey)],
            MetaData::ForeignKey(node) => vec![
                (node.foreign_table, Slot::ForeignKeys),
                (node.primary_table, Slot::ExportedKeys),
            ],
            MetaData::Index(node) => vec![(node.table, Slot::Indexes)],
            MetaData::Check(node) => vec![(node.table, Slot::Checks)],
            MetaData::Sequence(node) => match node.column {
                Some(column) => vec![(column, Slot::ColumnSequence)],
                None => vec![(node.schema, Slot::Sequences)],
            },
            MetaData::Trigger(node) => match node.column {
                Some(column) => vec![(column, Slot::ColumnTriggers)],
                None => vec![(node.table, Slot::Triggers)],
            },
            MetaData::UserDefinedType(node) => vec![(node.schema, Slot::UserDefinedTypes)],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Catalogs,
    Schemas,
    Tables,
    Sequences,
    UserDefinedTypes,
    Columns,
    PrimaryKey,
    Indexes,
    ForeignKeys,
    ExportedKeys,
    Checks,
    Triggers,
    ColumnSequence,
    ColumnTriggers,
}

/// Arena holding every node of one inspection.
///
/// Ownership runs downward (database, catalog, schema, table, column) through
/// child id lists. Back-references such as a column's table or a foreign key's
/// primary table are plain ids, so the arena never holds reference cycles.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct MetaDataGraph {
    nodes: Vec<Option<MetaData>>,
}

impl MetaDataGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and attach it to the child lists of its owner.
    ///
    /// This does no identity check; deduplication belongs to the caller.
    pub fn insert(&mut self, node: MetaData) -> ObjectId {
        let id = ObjectId(self.nodes.len());
        let links = node.links();
        self.nodes.push(Some(node));
        for (owner, slot) in links {
            self.attach(owner, slot, id);
        }
        id
    }

    /// Node `id`, if it is still in the graph.
    pub fn get(&self, id: ObjectId) -> Option<&MetaData> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut MetaData> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(index, _)| ObjectId(index))
    }

    /// Live nodes of one kind in insertion order.
    pub fn ids_of(&self, object_type: ObjectType) -> Vec<ObjectId> {
        self.ids()
            .filter(|id| {
                self.get(*id)
                    .is_some_and(|node| node.object_type() == object_type)
            })
            .collect()
    }

    /// Owned children of a node.
    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        match self.get(id) {
            Some(MetaData::Database(node)) => node.catalogs.clone(),
            Some(MetaData::Catalog(node)) => node.schemas.clone(),
            Some(MetaData::Schema(node)) => node
                .tables
                .iter()
                .chain(&node.sequences)
                .chain(&node.user_defined_types)
                .copied()
                .collect(),
            Some(MetaData::Table(node)) => node
                .columns
                .iter()
                .chain(node.primary_key.as_ref())
                .chain(&node.indexes)
                .chain(&node.foreign_keys)
                .chain(&node.checks)
                .chain(&node.triggers)
                .copied()
                .collect(),
            Some(MetaData::Column(node)) => node
                .sequence
                .iter()
                .chain(&node.triggers)
                .copied()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Remove a node with everything it owns, plus foreign keys that
    /// reference a removed table. Returns the ids that were removed.
    pub fn remove(&mut self, id: ObjectId) -> Vec<ObjectId> {
        let mut removed = Vec::new();
        self.remove_into(id, &mut removed);
        removed
    }

    fn remove_into(&mut self, id: ObjectId, removed: &mut Vec<ObjectId>) {
        let Some(node) = self.get(id) else {
            return;
        };
        for (owner, slot) in node.links() {
            self.detach(owner, slot, id);
        }
        self.remove_subtree(id, removed);
    }

    fn remove_subtree(&mut self, id: ObjectId, removed: &mut Vec<ObjectId>) {
        for child in self.children(id) {
            self.remove_subtree(child, removed);
        }
        let exported = match self.get(id) {
            Some(MetaData::Table(table)) => table.exported_keys.clone(),
            _ => Vec::new(),
        };
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        if let MetaData::ForeignKey(fk) = &node {
            self.detach(fk.primary_table, Slot::ExportedKeys, id);
        }
        removed.push(id);
        for fk in exported {
            self.remove_into(fk, removed);
        }
    }

    /// Identity path of a node: the names from catalog down to the node.
    pub fn path(&self, id: ObjectId) -> Vec<Option<Identifier>> {
        match self.get(id) {
            Some(node) => self.path_of(node),
            None => Vec::new(),
        }
    }

    /// Identity path `node` has, or would have once inserted.
    pub fn path_of(&self, node: &MetaData) -> Vec<Option<Identifier>> {
        let extend = |owner: ObjectId, name: Option<&Identifier>| {
            let mut path = self.path(owner);
            path.push(name.cloned());
            path
        };
        match node {
            MetaData::Database(_) => Vec::new(),
            MetaData::Catalog(node) => vec![node.name.clone()],
            MetaData::Schema(node) => extend(node.catalog, node.name.as_ref()),
            MetaData::Table(node) => extend(node.schema, Some(&node.name)),
            MetaData::Column(node) => extend(node.table, Some(&node.name)),
            MetaData::PrimaryKey(node) => self.path(node.table),
            MetaData::ForeignKey(node) => {
                let mut path = extend(node.foreign_table, node.name.as_ref());
                if node.name.is_none() {
                    path.extend(self.path(node.primary_table));
                }
                path
            }
            MetaData::Index(node) => extend(node.table, node.name.as_ref()),
            MetaData::Check(node) => extend(node.table, node.name.as_ref()),
            MetaData::Sequence(node) => match node.column {
                Some(column) => self.path(column),
                None => extend(node.schema, node.name.as_ref()),
            },
            MetaData::Trigger(node) => extend(node.column.unwrap_or(node.table), Some(&node.name)),
            MetaData::UserDefinedType(node) => extend(node.schema, Some(&node.name)),
        }
    }

    /// Dotted name of a node, e.g. `shop.app.orders.id`.
    pub fn qualified_name(&self, id: ObjectId) -> String {
        qualified_name(&self.path(id))
    }

    /// Walk owners upward until a node of `object_type` is found.
    pub fn ancestor(&self, id: ObjectId, object_type: ObjectType) -> Option<ObjectId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if node.object_type() == object_type {
                return Some(node_id);
            }
            current = node.owner();
        }
        None
    }

    fn attach(&mut self, owner: ObjectId, slot: Slot, id: ObjectId) {
        let push = |list: &mut Vec<ObjectId>| {
            if !list.contains(&id) {
                list.push(id);
            }
        };
        match (self.get_mut(owner), slot) {
            (Some(MetaData::Database(node)), Slot::Catalogs) => push(&mut node.catalogs),
            (Some(MetaData::Catalog(node)), Slot::Schemas) => push(&mut node.schemas),
            (Some(MetaData::Schema(node)), Slot::Tables) => push(&mut node.tables),
            (Some(MetaData::Schema(node)), Slot::Sequences) => push(&mut node.sequences),
            (Some(MetaData::Schema(node)), Slot::UserDefinedTypes) => {
                push(&mut node.user_defined_types)
            }
            (Some(MetaData::Table(node)), Slot::Columns) => push(&mut node.columns),
            (Some(MetaData::Table(node)), Slot::PrimaryKey) => node.primary_key = Some(id),
            (Some(MetaData::Table(node)), Slot::Indexes) => push(&mut node.indexes),
            (Some(MetaData::Table(node)), Slot::ForeignKeys) => push(&mut node.foreign_keys),
            (Some(MetaData::Table(node)), Slot::ExportedKeys) => push(&mut node.exported_keys),
            (Some(MetaData::Table(node)), Slot::Checks) => push(&mut node.checks),
            (Some(MetaData::Table(node)), Slot::Triggers) => push(&mut node.triggers),
            (Some(MetaData::Column(node)), Slot::ColumnSequence) => node.sequence = Some(id),
            (Some(MetaData::Column(node)), Slot::ColumnTriggers) => push(&mut node.triggers),
            _ => {}
        }
    }

    fn detach(&mut self, owner: ObjectId, slot: Slot, id: ObjectId) {
        let drop_id = |list: &mut Vec<ObjectId>| list.retain(|item| *item != id);
        match (self.get_mut(owner), slot) {
            (Some(MetaData::Database(node)), Slot::Catalogs) => drop_id(&mut node.catalogs),
            (Some(MetaData::Catalog(node)), Slot::Schemas) => drop_id(&mut node.schemas),
            (Some(MetaData::Schema(node)), Slot::Tables) => drop_id(&mut node.tables),
            (Some(MetaData::Schema(node)), Slot::Sequences) => drop_id(&mut node.sequences),
            (Some(MetaData::Schema(node)), Slot::UserDefinedTypes) => {
                drop_id(&mut node.user_defined_types)
            }
            (Some(MetaData::Table(node)), Slot::Columns) => drop_id(&mut node.columns),
            (Some(MetaData::Table(node)), Slot::PrimaryKey) => {
                if node.primary_key == Some(id) {
                    node.primary_key = None;
                }
            }
            (Some(MetaData::Table(node)), Slot::Indexes) => drop_id(&mut node.indexes),
            (Some(MetaData::Table(node)), Slot::ForeignKeys) => drop_id(&mut node.foreign_keys),
            (Some(MetaData::Table(node)), Slot::ExportedKeys) => {
                drop_id(&mut node.exported_keys)
            }
            (Some(MetaData::Table(node)), Slot::Checks) => drop_id(&mut node.checks),
            (Some(MetaData::Table(node)), Slot::Triggers) => drop_id(&mut node.triggers),
            (Some(MetaData::Column(node)), Slot::ColumnSequence) => {
                if node.sequence == Some(id) {
                    node.sequence = None;
                }
            }
            (Some(MetaData::Column(node)), Slot::ColumnTriggers) => drop_id(&mut node.triggers),
            _ => {}
        }
    }
}

macro_rules! typed_accessors {
    ($($get:ident, $get_mut:ident => $variant:ident;)*) => {
        impl MetaDataGraph {
            $(
                pub fn $get(&self, id: ObjectId) -> Option<&$variant> {
                    match self.get(id) {
                        Some(MetaData::$variant(node)) => Some(node),
                        _ => None,
                    }
                }

                pub fn $get_mut(&mut self, id: ObjectId) -> Option<&mut $variant> {
                    match self.get_mut(id) {
                        Some(MetaData::$variant(node)) => Some(node),
                        _ => None,
                    }
                }
            )*
        }
    };
}

typed_accessors! {
    database, database_mut => Database;
    catalog, catalog_mut => Catalog;
    schema, schema_mut => Schema;
    table, table_mut => Table;
    column, column_mut => Column;
    primary_key, primary_key_mut => PrimaryKey;
    foreign_key, foreign_key_mut => ForeignKey;
    index, index_mut => Index;
    check, check_mut => Check;
    sequence, sequence_mut => Sequence;
    trigger, trigger_mut => Trigger;
    user_defined_type, user_defined_type_mut => UserDefinedType;
}

/// Summary of the foreign key graph between tables.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeySummary {
    pub tables: usize,
    pub edges: usize,
}

/// Tables ordered so referenced tables precede the tables referencing them.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKeyOrder {
    pub summary: ForeignKeySummary,
    pub order: Option<Vec<ObjectId>>,
    pub cycle: Option<Vec<ObjectId>>,
}

impl MetaDataGraph {
    /// Order every table by foreign key dependencies.
    ///
    /// Self-references do not constrain the order. When the graph has a cycle
    /// the tables left on it are reported instead of an order.
    pub fn dependency_order(&self) -> ForeignKeyOrder {
        let graph = self.foreign_key_adjacency();
        let tables = graph.len();
        let edges = graph.values().map(BTreeSet::len).sum();
        let summary = ForeignKeySummary { tables, edges };

        match toposort(&graph) {
            Ok(order) => ForeignKeyOrder {
                summary,
                order: Some(order),
                cycle: None,
            },
            Err(cycle) => ForeignKeyOrder {
                summary,
                order: None,
                cycle: Some(cycle),
            },
        }
    }

    fn foreign_key_adjacency(&self) -> BTreeMap<ObjectId, BTreeSet<ObjectId>> {
        let mut graph: BTreeMap<ObjectId, BTreeSet<ObjectId>> = BTreeMap::new();
        for id in self.ids_of(ObjectType::Table) {
            graph.entry(id).or_default();
        }
        for id in self.ids_of(ObjectType::ForeignKey) {
            if let Some(fk) = self.foreign_key(id) {
                if fk.primary_table == fk.foreign_table {
                    continue;
                }
                graph.entry(fk.foreign_table).or_default();
                graph
                    .entry(fk.primary_table)
                    .or_default()
                    .insert(fk.foreign_table);
            }
        }
        graph
    }
}

fn toposort(graph: &BTreeMap<ObjectId, BTreeSet<ObjectId>>) -> Result<Vec<ObjectId>, Vec<ObjectId>> {
    let mut indegree: BTreeMap<ObjectId, usize> = graph.keys().map(|node| (*node, 0)).collect();
    for targets in graph.values() {
        for target in targets {
            *indegree.entry(*target).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<ObjectId> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut order = Vec::with_capacity(graph.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(*target);
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(node, _)| node)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ForeignKey;

    fn tree(graph: &mut MetaDataGraph, tables: &[&str]) -> Vec<ObjectId> {
        let database = graph.insert(MetaData::Database(Database::default()));
        let catalog = graph.insert(MetaData::Catalog(Catalog {
            name: None,
            database,
            schemas: Vec::new(),
        }));
        let schema = graph.insert(MetaData::Schema(Schema {
            name: Some("public".into()),
            catalog,
            tables: Vec::new(),
            sequences: Vec::new(),
            user_defined_types: Vec::new(),
        }));
        tables
            .iter()
            .map(|name| graph.insert(MetaData::Table(Table::new((*name).into(), schema))))
            .collect()
    }

    fn link(graph: &mut MetaDataGraph, foreign: ObjectId, primary: ObjectId) -> ObjectId {
        graph.insert(MetaData::ForeignKey(ForeignKey::new(None, foreign, primary)))
    }

    #[test]
    fn insert_attaches_to_owner() {
        let mut graph = MetaDataGraph::new();
        let tables = tree(&mut graph, &["users"]);
        let column = graph.insert(MetaData::Column(Column::new("id".into(), tables[0])));

        let table = graph.table(tables[0]).unwrap();
        assert_eq!(table.columns, vec![column]);
        assert_eq!(graph.qualified_name(column), "public.users.id");
        assert_eq!(
            graph.ancestor(column, ObjectType::Schema),
            Some(table.schema)
        );
    }

    #[test]
    fn foreign_keys_register_on_both_tables() {
        let mut graph = MetaDataGraph::new();
        let tables = tree(&mut graph, &["orders", "users"]);
        let fk = link(&mut graph, tables[0], tables[1]);

        assert_eq!(graph.table(tables[0]).unwrap().foreign_keys, vec![fk]);
        assert_eq!(graph.table(tables[1]).unwrap().exported_keys, vec![fk]);
    }

    #[test]
    fn removing_a_table_drops_owned_and_referencing_objects() {
        let mut graph = MetaDataGraph::new();
        let tables = tree(&mut graph, &["orders", "users"]);
        let column = graph.insert(MetaData::Column(Column::new("id".into(), tables[1])));
        let fk = link(&mut graph, tables[0], tables[1]);

        let removed = graph.remove(tables[1]);

        assert!(removed.contains(&tables[1]));
        assert!(removed.contains(&column));
        assert!(removed.contains(&fk));
        assert!(graph.table(tables[0]).unwrap().foreign_keys.is_empty());
        let schema = graph.table(tables[0]).unwrap().schema;
        assert_eq!(graph.schema(schema).unwrap().tables, vec![tables[0]]);
    }

    #[test]
    fn toposort_orders_dependencies() {
        let mut graph = MetaDataGraph::new();
        let tables = tree(&mut graph, &["orders", "users"]);
        link(&mut graph, tables[0], tables[1]);

        let report = graph.dependency_order();
        let order = report.order.expect("expected toposort");
        let users = order.iter().position(|id| *id == tables[1]).unwrap();
        let orders = order.iter().position(|id| *id == tables[0]).unwrap();
        assert!(users < orders);
        assert_eq!(report.summary.edges, 1);
    }

    #[test]
    fn toposort_ignores_self_references_but_reports_cycles() {
        let mut graph = MetaDataGraph::new();
        let tables = tree(&mut graph, &["a", "b"]);
        link(&mut graph, tables[0], tables[0]);
        assert!(graph.dependency_order().order.is_some());

        link(&mut graph, tables[0], tables[1]);
        link(&mut graph, tables[1], tables[0]);
        let report = graph.dependency_order();
        assert!(report.order.is_none());
        assert_eq!(report.cycle.unwrap(), tables);
    }
}

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use schemata_core::{
    Catalog, Check, Column, Database, ForeignKey, Identifier, Index, MetaData, MetaDataGraph,
    ObjectId, ObjectType, PrimaryKey, Schema, Sequence, Table, Trigger, UserDefinedType,
};

type Identity = (ObjectType, Vec<Option<Identifier>>);

/// Accumulated, deduplicated graph of one or more inspection runs.
///
/// Every node goes through [`InspectionResults::add_object`] or one of the
/// `add_*` helpers built on it, so a kind never holds two nodes with the same
/// identity path. Nodes added with `register = false` exist as reference
/// targets only and are left out of [`InspectionResults::get_objects`] until
/// something registers them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InspectionResults {
    graph: MetaDataGraph,
    #[serde(skip)]
    identities: HashMap<Identity, ObjectId>,
    objects: BTreeMap<ObjectType, Vec<ObjectId>>,
}

impl InspectionResults {
    /// Empty results.
    pub fn new() -> Self {
        Self::default()
    }

    /// The merged object graph.
    pub fn graph(&self) -> &MetaDataGraph {
        &self.graph
    }

    /// Mutable access for updating node attributes.
    ///
    /// Names and ownership links must not change through this handle and new
    /// nodes must not be inserted with it; both bypass the identity index.
    pub fn graph_mut(&mut self) -> &mut MetaDataGraph {
        &mut self.graph
    }

    /// Give up the listing and keep the graph.
    pub fn into_graph(self) -> MetaDataGraph {
        self.graph
    }

    /// Add `node` unless a node with the same identity exists, returning the
    /// id of whichever node now holds that identity.
    pub fn add_object(&mut self, node: MetaData, register: bool) -> ObjectId {
        let identity = (node.object_type(), self.graph.path_of(&node));
        let id = match self.identities.get(&identity) {
            Some(existing) => *existing,
            None => {
                let id = self.graph.insert(node);
                self.identities.insert(identity, id);
                id
            }
        };
        if register {
            self.register(id);
        }
        id
    }

    /// List an existing node among the discovered objects of its kind.
    pub fn register(&mut self, id: ObjectId) {
        let Some(kind) = self.graph.get(id).map(MetaData::object_type) else {
            return;
        };
        let listed = self.objects.entry(kind).or_default();
        if !listed.contains(&id) {
            listed.push(id);
        }
    }

    /// Whether `id` was discovered rather than only referenced.
    pub fn is_registered(&self, id: ObjectId) -> bool {
        self.graph
            .get(id)
            .and_then(|node| self.objects.get(&node.object_type()))
            .is_some_and(|listed| listed.contains(&id))
    }

    /// The first discovered object of a kind.
    pub fn get_object(&self, kind: ObjectType) -> Option<ObjectId> {
        self.get_objects(kind).first().copied()
    }

    /// Look up any node of a kind, registered or not, by identity path.
    pub fn find_object(&self, kind: ObjectType, path: &[Option<Identifier>]) -> Option<ObjectId> {
        self.identities.get(&(kind, path.to_vec())).copied()
    }

    /// Discovered objects of a kind in discovery order.
    pub fn get_objects(&self, kind: ObjectType) -> &[ObjectId] {
        self.objects.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove a node and everything it owns. Returns the removed ids.
    pub fn remove_object(&mut self, id: ObjectId) -> Vec<ObjectId> {
        let removed = self.graph.remove(id);
        let gone: HashSet<ObjectId> = removed.iter().copied().collect();
        self.identities.retain(|_, id| !gone.contains(id));
        for listed in self.objects.values_mut() {
            listed.retain(|id| !gone.contains(id));
        }
        removed
    }

    /// The single database node, created on first use.
    pub fn add_database(&mut self) -> ObjectId {
        self.add_object(MetaData::Database(Database::default()), true)
    }

    /// Catalog named `name`, created under the database on first use.
    pub fn add_catalog(&mut self, name: Option<Identifier>, register: bool) -> ObjectId {
        let database = self.add_database();
        self.add_object(
            MetaData::Catalog(Catalog {
                name,
                database,
                schemas: Vec::new(),
            }),
            register,
        )
    }

    /// Schema in `catalog`, created together with its catalog on first use.
    pub fn add_schema(
        &mut self,
        catalog: Option<Identifier>,
        name: Option<Identifier>,
        register: bool,
    ) -> ObjectId {
        let catalog = self.add_catalog(catalog, register);
        self.add_object(
            MetaData::Schema(Schema {
                name,
                catalog,
                tables: Vec::new(),
                sequences: Vec::new(),
                user_defined_types: Vec::new(),
            }),
            register,
        )
    }

    /// Table at `catalog.schema.name`, creating missing parents.
    ///
    /// With `register` off the table and any parents it creates stay out of
    /// the listing and serve only as reference targets.
    pub fn add_table(
        &mut self,
        catalog: Option<Identifier>,
        schema: Option<Identifier>,
        name: Identifier,
        register: bool,
    ) -> ObjectId {
        let schema = self.add_schema(catalog, schema, register);
        self.add_object(MetaData::Table(Table::new(name, schema)), register)
    }

    /// Column of `table`, registered only when the table is.
    pub fn add_column(&mut self, table: ObjectId, name: Identifier) -> ObjectId {
        let register = self.is_registered(table);
        self.add_object(MetaData::Column(Column::new(name, table)), register)
    }

    /// The primary key of `table`. A table has at most one, so a name seen
    /// later fills in an unnamed key instead of creating a second one.
    pub fn add_primary_key(&mut self, table: ObjectId, name: Option<Identifier>) -> ObjectId {
        let id = self.add_object(
            MetaData::PrimaryKey(PrimaryKey {
                name: name.clone(),
                table,
                columns: BTreeMap::new(),
            }),
            true,
        );
        if let Some(key) = self.graph.primary_key_mut(id) {
            if key.name.is_none() {
                key.name = name;
            }
        }
        id
    }

    /// Foreign key owned by `foreign_table`.
    pub fn add_foreign_key(
        &mut self,
        foreign_table: ObjectId,
        primary_table: ObjectId,
        name: Option<Identifier>,
    ) -> ObjectId {
        self.add_object(
            MetaData::ForeignKey(ForeignKey::new(name, foreign_table, primary_table)),
            true,
        )
    }

    /// Index on `table`; unnamed indexes share one identity.
    pub fn add_index(&mut self, table: ObjectId, name: Option<Identifier>) -> ObjectId {
        self.add_object(MetaData::Index(Index::new(name, table)), true)
    }

    /// Check constraint on `table`; the text is replaced on every merge.
    pub fn add_check(&mut self, table: ObjectId, name: Option<Identifier>, text: String) -> ObjectId {
        let id = self.add_object(
            MetaData::Check(Check {
                name,
                table,
                column: None,
                text: text.clone(),
            }),
            true,
        );
        if let Some(check) = self.graph.check_mut(id) {
            check.text = text;
        }
        id
    }

    /// Standalone sequence in `schema`.
    pub fn add_sequence(&mut self, schema: ObjectId, name: Identifier) -> ObjectId {
        self.add_object(MetaData::Sequence(Sequence::new(Some(name), schema, None)), true)
    }

    /// The generator behind an auto-increment column. `None` when the column
    /// is not attached to a table in a schema.
    pub fn add_auto_increment(
        &mut self,
        column: ObjectId,
        name: Option<Identifier>,
    ) -> Option<ObjectId> {
        let table = self.graph.column(column)?.table;
        let schema = self.graph.table(table)?.schema;
        let id = self.add_object(
            MetaData::Sequence(Sequence::new(name.clone(), schema, Some(column))),
            true,
        );
        if let Some(sequence) = self.graph.sequence_mut(id) {
            if sequence.name.is_none() {
                sequence.name = name;
            }
        }
        if let Some(node) = self.graph.column_mut(column) {
            node.auto_increment = true;
        }
        Some(id)
    }

    /// Table-level trigger.
    pub fn add_trigger(&mut self, table: ObjectId, name: Identifier) -> ObjectId {
        self.add_object(MetaData::Trigger(Trigger::new(name, table, None)), true)
    }

    /// Trigger attached to a single column.
    pub fn add_column_trigger(
        &mut self,
        table: ObjectId,
        column: ObjectId,
        name: Identifier,
    ) -> ObjectId {
        self.add_object(MetaData::Trigger(Trigger::new(name, table, Some(column))), true)
    }

    /// User-defined type in `schema`.
    pub fn add_user_defined_type(&mut self, schema: ObjectId, name: Identifier) -> ObjectId {
        self.add_object(
            MetaData::UserDefinedType(UserDefinedType::new(name, schema)),
            true,
        )
    }

    /// Column of `table` by name, if already discovered.
    pub fn find_column(&self, table: ObjectId, name: &Identifier) -> Option<ObjectId> {
        let mut path = self.graph.path(table);
        path.push(Some(name.clone()));
        self.find_object(ObjectType::Column, &path)
    }
}

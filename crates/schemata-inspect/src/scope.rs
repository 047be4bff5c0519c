use serde::{Deserialize, Serialize};

use schemata_core::{MetaData, MetaDataGraph, ObjectId, ObjectType};

/// Narrows one inspection pass to a catalog, schema or table.
///
/// Names may be SQL `LIKE` patterns (`%`, `_`, `\` escape); `None` matches
/// anything. An empty `table_types` list accepts every table type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionScope {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub table_types: Vec<String>,
}

impl InspectionScope {
    /// The unrestricted scope.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to catalogs matching `catalog`.
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Restrict to schemas matching `schema`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Restrict to tables matching `table`.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Restrict to the given table types.
    pub fn with_table_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Scope covering an object already in the graph and everything under it.
    pub fn for_object(graph: &MetaDataGraph, id: ObjectId) -> Self {
        let name_of = |kind: ObjectType| {
            graph
                .ancestor(id, kind)
                .and_then(|ancestor| graph.get(ancestor))
                .and_then(MetaData::name)
                .map(|name| name.value().to_string())
        };
        Self {
            catalog: name_of(ObjectType::Catalog),
            schema: name_of(ObjectType::Schema),
            table: name_of(ObjectType::Table),
            table_types: Vec::new(),
        }
    }

    /// No restriction at all.
    pub fn is_all(&self) -> bool {
        self.catalog.is_none() && self.schema.is_none() && self.table.is_none()
    }

    /// Both schema and table are named.
    pub fn has_schema_and_table(&self) -> bool {
        self.schema.is_some() && self.table.is_some()
    }

    /// Whether an object at `catalog.schema.table` falls inside this scope.
    ///
    /// A missing level on the object side only matches an unrestricted level.
    pub fn contains(&self, catalog: Option<&str>, schema: Option<&str>, table: Option<&str>) -> bool {
        level_matches(self.catalog.as_deref(), catalog)
            && level_matches(self.schema.as_deref(), schema)
            && level_matches(self.table.as_deref(), table)
    }

    pub fn matches_catalog(&self, catalog: Option<&str>) -> bool {
        level_matches(self.catalog.as_deref(), catalog)
    }

    pub fn matches_schema(&self, schema: Option<&str>) -> bool {
        level_matches(self.schema.as_deref(), schema)
    }

    /// Whether rows of `table_type` belong in the scope.
    pub fn accepts_table_type(&self, table_type: &str) -> bool {
        self.table_types.is_empty()
            || self
                .table_types
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(table_type))
    }
}

fn level_matches(pattern: Option<&str>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(pattern), Some(value)) => like_match(pattern, value),
        (Some(_), None) => false,
    }
}

/// SQL `LIKE` match ignoring ASCII case.
pub fn like_match(pattern: &str, value: &str) -> bool {
    let pattern = parse_pattern(pattern);
    let value: Vec<char> = value.chars().map(|ch| ch.to_ascii_lowercase()).collect();
    matches_from(&pattern, &value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Literal(char),
    One,
    Any,
}

fn parse_pattern(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        let token = match ch {
            '\\' => Token::Literal(chars.next().unwrap_or('\\').to_ascii_lowercase()),
            '%' => Token::Any,
            '_' => Token::One,
            other => Token::Literal(other.to_ascii_lowercase()),
        };
        tokens.push(token);
    }
    tokens
}

fn matches_from(pattern: &[Token], value: &[char]) -> bool {
    // Iterative wildcard match with single backtrack point on the last `%`.
    let (mut p, mut v) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while v < value.len() {
        match pattern.get(p) {
            Some(Token::Literal(ch)) if *ch == value[v] => {
                p += 1;
                v += 1;
            }
            Some(Token::One) => {
                p += 1;
                v += 1;
            }
            Some(Token::Any) => {
                star = Some((p, v));
                p += 1;
            }
            _ => match star {
                Some((star_p, star_v)) => {
                    p = star_p + 1;
                    v = star_v + 1;
                    star = Some((star_p, star_v + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|token| *token == Token::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_core::{Catalog, Column, Database, Schema, Table};

    #[test]
    fn like_patterns() {
        assert!(like_match("ORD%", "orders"));
        assert!(like_match("%lines", "order_lines"));
        assert!(like_match("order_lines", "orderXlines"));
        assert!(!like_match("order\\_lines", "orderXlines"));
        assert!(like_match("order\\_lines", "order_lines"));
        assert!(like_match("%", ""));
        assert!(!like_match("a_", "a"));
        assert!(like_match("a%b%c", "aXXbYYc"));
        assert!(!like_match("a%b%c", "aXXbYY"));
    }

    #[test]
    fn contains_honours_each_level() {
        let scope = InspectionScope::all().with_schema("S2");
        assert!(scope.contains(None, Some("S2"), Some("CHILD")));
        assert!(!scope.contains(None, Some("S1"), Some("PARENT")));
        assert!(!scope.contains(Some("db"), None, Some("PARENT")));
        assert!(InspectionScope::all().contains(None, None, None));
    }

    #[test]
    fn table_types_filter_ignores_case() {
        let scope = InspectionScope::all().with_table_types(["TABLE", "VIEW"]);
        assert!(scope.accepts_table_type("view"));
        assert!(!scope.accepts_table_type("SYSTEM TABLE"));
        assert!(InspectionScope::all().accepts_table_type("anything"));
    }

    #[test]
    fn scope_for_column_names_its_table() {
        let mut graph = MetaDataGraph::new();
        let database = graph.insert(MetaData::Database(Database::default()));
        let catalog = graph.insert(MetaData::Catalog(Catalog {
            name: None,
            database,
            schemas: Vec::new(),
        }));
        let schema = graph.insert(MetaData::Schema(Schema {
            name: Some("APP".into()),
            catalog,
            tables: Vec::new(),
            sequences: Vec::new(),
            user_defined_types: Vec::new(),
        }));
        let table = graph.insert(MetaData::Table(Table::new("ORDERS".into(), schema)));
        let column = graph.insert(MetaData::Column(Column::new("ID".into(), table)));

        let scope = InspectionScope::for_object(&graph, column);
        assert_eq!(scope, InspectionScope::all().with_schema("APP").with_table("ORDERS"));
        assert_eq!(InspectionScope::for_object(&graph, database), InspectionScope::all());
    }
}

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use schemata_core::{DatabaseInfo, DriverInfo, Result};

/// A single value read from a result row or bound as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrowed text, for text values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Render any non-null value as text.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(value) => Some(value.to_string()),
            Value::Int(value) => Some(value.to_string()),
            Value::Float(value) => Some(value.to_string()),
            Value::Text(value) => Some(value.clone()),
        }
    }

    /// Integer view; text is parsed and floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Bool(value) => Some(i64::from(*value)),
            Value::Float(value) => float_to_i64(*value),
            Value::Text(value) => value.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Wide integer view, for sequence bounds beyond `i64`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Text(value) => value.trim().parse().ok(),
            other => other.as_i64().map(i128::from),
        }
    }

    /// Interpret flags such as `YES`, `Y`, `t`, `1` or a boolean column.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            Value::Int(value) => Some(*value != 0),
            Value::Float(value) => Some(*value != 0.0),
            Value::Text(value) => match value.trim().to_uppercase().as_str() {
                "YES" | "Y" | "TRUE" | "T" | "1" | "ENABLED" => Some(true),
                "NO" | "N" | "FALSE" | "F" | "0" | "DISABLED" => Some(false),
                _ => None,
            },
            Value::Null => None,
        }
    }
}

/// `value` as an integer when it has no fraction and fits in `i64`.
fn float_to_i64(value: f64) -> Option<i64> {
    // 2^63 is exact as f64; the upper bound is exclusive.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.fract() != 0.0 || !(-LIMIT..LIMIT).contains(&value) {
        return None;
    }
    Some(value as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// One result row. Labels are matched ignoring ASCII case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Row::push`].
    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(label, value);
        self
    }

    /// Append a labelled value.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.values.push((label.into(), value.into()));
    }

    /// Value for `label`, matched without case.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, value)| value)
    }

    /// Text value with trailing padding removed; `None` for null or empty.
    pub fn string(&self, label: &str) -> Option<String> {
        self.get(label)
            .and_then(Value::to_text)
            .map(|text| text.trim_end().to_string())
            .filter(|text| !text.is_empty())
    }

    /// Integer value of `label`.
    pub fn int(&self, label: &str) -> Option<i64> {
        self.get(label).and_then(Value::as_i64)
    }

    /// Wide integer value of `label`.
    pub fn int128(&self, label: &str) -> Option<i128> {
        self.get(label).and_then(Value::as_i128)
    }

    /// Flag value of `label`, accepting `YES`/`NO` style text.
    pub fn boolean(&self, label: &str) -> Option<bool> {
        self.get(label).and_then(Value::as_bool)
    }

    /// Labels in column order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(label, _)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Handle to a prepared statement opened on a [`Connection`].
///
/// Clones share the same handle; [`Statement::same_as`] tells whether two
/// handles came from one preparation.
#[derive(Debug, Clone)]
pub struct Statement {
    inner: Arc<StatementHandle>,
}

#[derive(Debug)]
struct StatementHandle {
    id: u64,
    sql: String,
}

impl Statement {
    /// Handle for statement `id` prepared from `sql`.
    pub fn new(id: u64, sql: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StatementHandle {
                id,
                sql: sql.into(),
            }),
        }
    }

    /// Connection-assigned statement id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Query text the statement was prepared from.
    pub fn sql(&self) -> &str {
        &self.inner.sql
    }

    /// Whether both handles point at the same prepared statement.
    pub fn same_as(&self, other: &Statement) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Driver-level metadata calls. Name fields accept `LIKE` patterns; `None`
/// means any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetaDataRequest {
    Catalogs,
    Schemas {
        catalog: Option<String>,
        schema: Option<String>,
    },
    Tables {
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
        types: Vec<String>,
    },
    Columns {
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
        column: Option<String>,
    },
    PrimaryKeys {
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
    },
    /// Foreign keys owned by the matching tables.
    ImportedKeys {
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
    },
    IndexInfo {
        catalog: Option<String>,
        schema: Option<String>,
        table: Option<String>,
        unique_only: bool,
    },
    UserDefinedTypes {
        catalog: Option<String>,
        schema: Option<String>,
        type_name: Option<String>,
    },
}

impl MetaDataRequest {
    /// Short request name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            MetaDataRequest::Catalogs => "catalogs",
            MetaDataRequest::Schemas { .. } => "schemas",
            MetaDataRequest::Tables { .. } => "tables",
            MetaDataRequest::Columns { .. } => "columns",
            MetaDataRequest::PrimaryKeys { .. } => "primary_keys",
            MetaDataRequest::ImportedKeys { .. } => "imported_keys",
            MetaDataRequest::IndexInfo { .. } => "index_info",
            MetaDataRequest::UserDefinedTypes { .. } => "user_defined_types",
        }
    }
}

/// Standard labels of driver metadata result sets.
pub mod labels {
    pub const TABLE_CAT: &str = "TABLE_CAT";
    pub const TABLE_CATALOG: &str = "TABLE_CATALOG";
    pub const TABLE_SCHEM: &str = "TABLE_SCHEM";
    pub const TABLE_NAME: &str = "TABLE_NAME";
    pub const TABLE_TYPE: &str = "TABLE_TYPE";
    pub const REMARKS: &str = "REMARKS";
    pub const COLUMN_NAME: &str = "COLUMN_NAME";
    pub const DATA_TYPE: &str = "DATA_TYPE";
    pub const TYPE_NAME: &str = "TYPE_NAME";
    pub const COLUMN_SIZE: &str = "COLUMN_SIZE";
    pub const DECIMAL_DIGITS: &str = "DECIMAL_DIGITS";
    pub const NULLABLE: &str = "NULLABLE";
    pub const IS_NULLABLE: &str = "IS_NULLABLE";
    pub const COLUMN_DEF: &str = "COLUMN_DEF";
    pub const ORDINAL_POSITION: &str = "ORDINAL_POSITION";
    pub const IS_AUTOINCREMENT: &str = "IS_AUTOINCREMENT";
    pub const KEY_SEQ: &str = "KEY_SEQ";
    pub const PK_NAME: &str = "PK_NAME";
    pub const PKTABLE_CAT: &str = "PKTABLE_CAT";
    pub const PKTABLE_SCHEM: &str = "PKTABLE_SCHEM";
    pub const PKTABLE_NAME: &str = "PKTABLE_NAME";
    pub const PKCOLUMN_NAME: &str = "PKCOLUMN_NAME";
    pub const FKTABLE_CAT: &str = "FKTABLE_CAT";
    pub const FKTABLE_SCHEM: &str = "FKTABLE_SCHEM";
    pub const FKTABLE_NAME: &str = "FKTABLE_NAME";
    pub const FKCOLUMN_NAME: &str = "FKCOLUMN_NAME";
    pub const FK_NAME: &str = "FK_NAME";
    pub const UPDATE_RULE: &str = "UPDATE_RULE";
    pub const DELETE_RULE: &str = "DELETE_RULE";
    pub const DEFERRABILITY: &str = "DEFERRABILITY";
    pub const NON_UNIQUE: &str = "NON_UNIQUE";
    pub const INDEX_NAME: &str = "INDEX_NAME";
    pub const TYPE: &str = "TYPE";
    pub const ASC_OR_DESC: &str = "ASC_OR_DESC";
    pub const FILTER_CONDITION: &str = "FILTER_CONDITION";
    pub const TYPE_CAT: &str = "TYPE_CAT";
    pub const TYPE_SCHEM: &str = "TYPE_SCHEM";
    pub const BASE_TYPE: &str = "BASE_TYPE";

    // Labels of dialect queries for objects drivers do not describe.
    pub const CHECK_NAME: &str = "CHECK_NAME";
    pub const CHECK_TEXT: &str = "CHECK_TEXT";
    pub const SEQUENCE_CAT: &str = "SEQUENCE_CAT";
    pub const SEQUENCE_SCHEM: &str = "SEQUENCE_SCHEM";
    pub const SEQUENCE_NAME: &str = "SEQUENCE_NAME";
    pub const START_WITH: &str = "START_WITH";
    pub const INCREMENT_BY: &str = "INCREMENT_BY";
    pub const MIN_VALUE: &str = "MIN_VALUE";
    pub const MAX_VALUE: &str = "MAX_VALUE";
    pub const LAST_VALUE: &str = "LAST_VALUE";
    pub const CYCLE: &str = "CYCLE";
    pub const CACHE_SIZE: &str = "CACHE_SIZE";
    pub const TEMPORARY: &str = "TEMPORARY";
    pub const TRIGGER_NAME: &str = "TRIGGER_NAME";
    pub const TRIGGER_EVENT: &str = "TRIGGER_EVENT";
    pub const TRIGGER_TIMING: &str = "TRIGGER_TIMING";
    pub const TRIGGER_LEVEL: &str = "TRIGGER_LEVEL";
    pub const TRIGGER_BODY: &str = "TRIGGER_BODY";
    pub const ACTIVE: &str = "ACTIVE";
    pub const TYPE_KIND: &str = "TYPE_KIND";
    pub const TYPE_VALUES: &str = "TYPE_VALUES";
    pub const DEFINITION: &str = "DEFINITION";
    pub const INDEX_TYPE: &str = "INDEX_TYPE";

    /// `TYPE` value of index-info rows that carry table statistics.
    pub const TABLE_INDEX_STATISTIC: i64 = 0;
}

/// A live database connection as seen by the inspection engine.
///
/// The engine never opens or closes connections; it prepares statements,
/// runs them, and closes the statements it opened.
#[async_trait]
pub trait Connection: Send {
    async fn database_info(&mut self) -> Result<DatabaseInfo>;

    async fn driver_info(&mut self) -> Result<DriverInfo>;

    /// Run a driver metadata call. Rows use the [`labels`] vocabulary.
    async fn metadata(&mut self, request: &MetaDataRequest) -> Result<Vec<Row>>;

    async fn prepare(&mut self, sql: &str) -> Result<Statement>;

    async fn execute(&mut self, statement: &Statement, params: &[Value]) -> Result<Vec<Row>>;

    async fn close_statement(&mut self, statement: &Statement) -> Result<()>;

    fn is_auto_commit(&self) -> bool {
        true
    }

    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_ignores_label_case() {
        let row = Row::new().with("TABLE_NAME", "orders").with("key_seq", 2);
        assert_eq!(row.string("table_name").as_deref(), Some("orders"));
        assert_eq!(row.int("KEY_SEQ"), Some(2));
        assert!(row.get("COLUMN_NAME").is_none());
    }

    #[test]
    fn floats_convert_only_when_integral() {
        assert_eq!(Value::Float(300.0).as_i64(), Some(300));
        assert_eq!(Value::Float(-2.0).as_i64(), Some(-2));
        assert_eq!(Value::Float(2.5).as_i64(), None);
        assert_eq!(Value::Float(1e19).as_i64(), None);
        assert_eq!(Value::Float(f64::NAN).as_i64(), None);
        assert_eq!(Value::Float(f64::INFINITY).as_i64(), None);
    }

    #[test]
    fn row_strings_drop_padding_and_empties() {
        let row = Row::new()
            .with("CHECK_NAME", "ck_age   ")
            .with("EMPTY", "")
            .with("MISSING", Value::Null);
        assert_eq!(row.string("CHECK_NAME").as_deref(), Some("ck_age"));
        assert_eq!(row.string("EMPTY"), None);
        assert_eq!(row.string("MISSING"), None);
    }

    #[test]
    fn flags_decode_from_text_and_numbers() {
        assert_eq!(Value::from("YES").as_bool(), Some(true));
        assert_eq!(Value::from("n").as_bool(), Some(false));
        assert_eq!(Value::from(0).as_bool(), Some(false));
        assert_eq!(Value::from("maybe").as_bool(), None);
    }

    #[test]
    fn large_numbers_parse_from_text() {
        let max = Value::from("9999999999999999999999999999");
        assert_eq!(max.as_i64(), None);
        assert_eq!(max.as_i128(), Some(9_999_999_999_999_999_999_999_999_999));
    }

    #[test]
    fn clones_share_one_statement() {
        let statement = Statement::new(1, "select 1");
        let clone = statement.clone();
        let other = Statement::new(1, "select 1");
        assert!(statement.same_as(&clone));
        assert!(!statement.same_as(&other));
    }
}

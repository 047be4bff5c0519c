use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Product name and version of the inspected database.
///
/// Also used as a registration key: a key matches a live database when the
/// live product name starts with the key's name (ignoring case) and the live
/// version is at least the key's version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseInfo {
    pub product_name: String,
    pub product_version: Option<String>,
    pub major_version: Option<u32>,
    pub minor_version: Option<u32>,
}

impl DatabaseInfo {
    /// Product without version information.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            product_version: None,
            major_version: None,
            minor_version: None,
        }
    }

    /// Set the major version; any minor version is kept.
    pub fn with_major(mut self, major: u32) -> Self {
        self.major_version = Some(major);
        self
    }

    /// Set major and minor versions.
    pub fn with_version(mut self, major: u32, minor: u32) -> Self {
        self.major_version = Some(major);
        self.minor_version = Some(minor);
        self
    }

    /// Raw version string as reported by the server.
    pub fn with_product_version(mut self, version: impl Into<String>) -> Self {
        self.product_version = Some(version.into());
        self
    }

    /// Whether this registration key applies to the `actual` database.
    pub fn matches(&self, actual: &DatabaseInfo) -> bool {
        let name = self.product_name.to_lowercase();
        if !actual.product_name.to_lowercase().starts_with(&name) {
            return false;
        }
        let Some(major) = self.major_version else {
            return true;
        };
        let Some(actual_major) = actual.major_version else {
            return false;
        };
        if actual_major != major {
            return actual_major > major;
        }
        match self.minor_version {
            Some(minor) => actual.minor_version.unwrap_or(0) >= minor,
            None => true,
        }
    }

    /// Ordering key for picking the most specific of several matching keys.
    pub fn specificity(&self) -> (usize, bool, u32, u32) {
        (
            self.product_name.len(),
            self.major_version.is_some(),
            self.major_version.unwrap_or(0),
            self.minor_version.unwrap_or(0),
        )
    }
}

impl fmt::Display for DatabaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_name)?;
        match (&self.product_version, self.major_version, self.minor_version) {
            (Some(version), _, _) => write!(f, " {version}"),
            (None, Some(major), Some(minor)) => write!(f, " {major}.{minor}"),
            (None, Some(major), None) => write!(f, " {major}"),
            _ => Ok(()),
        }
    }
}

/// Name and version of the driver serving the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DriverInfo {
    pub name: String,
    pub version: Option<String>,
}

/// Column type as reported by the driver, after dialect aliasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnType {
    /// Standard SQL type code (`java.sql.Types` numbering).
    pub type_code: i32,
    pub type_name: String,
    pub size: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
}

/// Standard SQL type codes used by drivers to describe column types.
pub mod type_codes {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const SMALLINT: i32 = 5;
    pub const INTEGER: i32 = 4;
    pub const BIGINT: i32 = -5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const CHAR: i32 = 1;
    pub const VARCHAR: i32 = 12;
    pub const LONGVARCHAR: i32 = -1;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const BINARY: i32 = -2;
    pub const VARBINARY: i32 = -3;
    pub const LONGVARBINARY: i32 = -4;
    pub const OTHER: i32 = 1111;
    pub const JAVA_OBJECT: i32 = 2000;
    pub const DISTINCT: i32 = 2001;
    pub const STRUCT: i32 = 2002;
    pub const ARRAY: i32 = 2003;
    pub const BLOB: i32 = 2004;
    pub const CLOB: i32 = 2005;
    pub const BOOLEAN: i32 = 16;
}

/// Kind of table-like object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
    MaterializedView,
    ForeignTable,
    SystemTable,
    Other(String),
}

impl TableKind {
    /// Map a driver-reported `TABLE_TYPE` value.
    pub fn from_table_type(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "TABLE" | "BASE TABLE" | "PARTITIONED TABLE" => TableKind::Table,
            "VIEW" => TableKind::View,
            "MATERIALIZED VIEW" => TableKind::MaterializedView,
            "FOREIGN TABLE" => TableKind::ForeignTable,
            "SYSTEM TABLE" => TableKind::SystemTable,
            _ => TableKind::Other(value.to_string()),
        }
    }
}

/// Referential action for foreign key updates and deletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Decode the numeric rule reported in `UPDATE_RULE`/`DELETE_RULE`.
    pub fn from_rule(code: i64) -> Self {
        match code {
            0 => ReferentialAction::Cascade,
            1 => ReferentialAction::Restrict,
            2 => ReferentialAction::SetNull,
            4 => ReferentialAction::SetDefault,
            _ => ReferentialAction::NoAction,
        }
    }
}

/// Constraint deferrability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Deferrability {
    InitiallyDeferred,
    InitiallyImmediate,
    #[default]
    NotDeferrable,
}

impl Deferrability {
    /// Decode the numeric value reported in `DEFERRABILITY`.
    pub fn from_code(code: i64) -> Self {
        match code {
            5 => Deferrability::InitiallyDeferred,
            6 => Deferrability::InitiallyImmediate,
            _ => Deferrability::NotDeferrable,
        }
    }
}

/// Index column ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Decode `ASC_OR_DESC` (`A`, `D` or absent).
    pub fn from_code(code: Option<&str>) -> Option<Self> {
        match code.map(str::trim) {
            Some("A") | Some("a") => Some(SortOrder::Asc),
            Some("D") | Some("d") => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// When a trigger fires relative to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    /// Timing from a keyword such as `BEFORE` or `INSTEAD OF`, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        if upper.starts_with("BEFORE") {
            Some(TriggerTiming::Before)
        } else if upper.starts_with("AFTER") {
            Some(TriggerTiming::After)
        } else if upper.starts_with("INSTEAD") {
            Some(TriggerTiming::InsteadOf)
        } else {
            None
        }
    }
}

/// Statement kind a trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

impl TriggerEvent {
    /// Parse one or more events from text such as `INSERT OR UPDATE`.
    pub fn parse_all(value: &str) -> Vec<Self> {
        let upper = value.to_uppercase();
        let mut events = Vec::new();
        for (needle, event) in [
            ("INSERT", TriggerEvent::Insert),
            ("UPDATE", TriggerEvent::Update),
            ("DELETE", TriggerEvent::Delete),
            ("TRUNCATE", TriggerEvent::Truncate),
        ] {
            if upper.contains(needle) {
                events.push(event);
            }
        }
        events
    }
}

/// Flavour of a user-defined type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserDefinedTypeKind {
    Enum,
    Domain,
    Composite,
    #[default]
    Distinct,
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_only_key_matches_any_version() {
        let key = DatabaseInfo::new("PostgreSQL");
        assert!(key.matches(&DatabaseInfo::new("PostgreSQL").with_version(16, 2)));
        assert!(key.matches(&DatabaseInfo::new("postgresql")));
        assert!(!key.matches(&DatabaseInfo::new("MySQL")));
    }

    #[test]
    fn versioned_key_is_a_lower_bound() {
        let key = DatabaseInfo::new("Microsoft SQL Server").with_major(11);
        assert!(key.matches(&DatabaseInfo::new("Microsoft SQL Server").with_major(11)));
        assert!(key.matches(&DatabaseInfo::new("Microsoft SQL Server").with_version(15, 0)));
        assert!(!key.matches(&DatabaseInfo::new("Microsoft SQL Server").with_major(10)));
        assert!(!key.matches(&DatabaseInfo::new("Microsoft SQL Server")));
    }

    #[test]
    fn minor_version_refines_same_major() {
        let key = DatabaseInfo::new("MySQL").with_version(8, 16);
        assert!(key.matches(&DatabaseInfo::new("MySQL").with_version(8, 16)));
        assert!(key.matches(&DatabaseInfo::new("MySQL").with_version(9, 0)));
        assert!(!key.matches(&DatabaseInfo::new("MySQL").with_version(8, 0)));
    }

    #[test]
    fn prefix_matching_covers_platform_suffixes() {
        let key = DatabaseInfo::new("DB2");
        assert!(key.matches(&DatabaseInfo::new("DB2/LINUXX8664")));
    }

    #[test]
    fn versioned_keys_are_more_specific() {
        let plain = DatabaseInfo::new("Oracle");
        let versioned = DatabaseInfo::new("Oracle").with_major(12);
        assert!(versioned.specificity() > plain.specificity());
    }

    #[test]
    fn decodes_driver_codes() {
        assert_eq!(ReferentialAction::from_rule(0), ReferentialAction::Cascade);
        assert_eq!(ReferentialAction::from_rule(3), ReferentialAction::NoAction);
        assert_eq!(Deferrability::from_code(5), Deferrability::InitiallyDeferred);
        assert_eq!(SortOrder::from_code(Some("D")), Some(SortOrder::Desc));
        assert_eq!(TableKind::from_table_type("BASE TABLE"), TableKind::Table);
        assert_eq!(
            TriggerEvent::parse_all("INSERT OR UPDATE"),
            vec![TriggerEvent::Insert, TriggerEvent::Update]
        );
    }
}

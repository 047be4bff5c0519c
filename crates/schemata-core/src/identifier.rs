use std::fmt;
use std::hash::{Hash, Hasher};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A catalog object name together with its case rule.
///
/// Case-sensitive identifiers (the ones a dialect would have to quote) compare
/// exactly. Case-insensitive identifiers compare on their lower-cased form, so
/// `orders`, `ORDERS` and `Orders` are the same unquoted name. A case-sensitive
/// identifier never equals a case-insensitive one.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Identifier {
    value: String,
    case_sensitive: bool,
}

impl Identifier {
    /// Identifier with an explicit case rule.
    pub fn new(value: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            value: value.into(),
            case_sensitive,
        }
    }

    /// An unquoted, case-insensitive identifier.
    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(value, false)
    }

    /// A quoted, case-sensitive identifier.
    pub fn quoted(value: impl Into<String>) -> Self {
        Self::new(value, true)
    }

    /// The name as reported by the database.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the name compares exactly.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// The form used for equality and hashing.
    pub fn normalized(&self) -> String {
        if self.case_sensitive {
            self.value.clone()
        } else {
            self.value.to_lowercase()
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.case_sensitive == other.case_sensitive && self.normalized() == other.normalized()
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.case_sensitive.hash(state);
        self.normalized().hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::plain(value)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::plain(value)
    }
}

/// Render an identifier path such as `catalog.schema.table`, skipping absent levels.
pub fn qualified_name(path: &[Option<Identifier>]) -> String {
    path.iter()
        .flatten()
        .map(Identifier::value)
        .collect::<Vec<_>>()
        .join(".")
}

//! Lookup of per-product strategies keyed by [`DatabaseInfo`].

use schemata_core::DatabaseInfo;

/// Values registered per database product with an optional fallback.
///
/// Resolution picks the most specific registered key that matches the live
/// database (longest product name, then highest minimum version). Ties go to
/// the later registration.
#[derive(Debug, Clone)]
pub struct ProductRegistry<T> {
    entries: Vec<(DatabaseInfo, T)>,
    fallback: Option<T>,
}

impl<T> ProductRegistry<T> {
    /// Empty registry without a fallback.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: None,
        }
    }

    /// Register `value` for `key`, replacing an earlier value with an equal key.
    pub fn register(&mut self, key: DatabaseInfo, value: T) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value returned when no registered product matches.
    pub fn set_fallback(&mut self, value: T) {
        self.fallback = Some(value);
    }

    /// The value used when no product matches.
    pub fn fallback(&self) -> Option<&T> {
        self.fallback.as_ref()
    }

    /// Most specific registration matching `info`, else the fallback.
    pub fn resolve(&self, info: &DatabaseInfo) -> Option<&T> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, (key, _))| key.matches(info))
            .max_by_key(|(position, (key, _))| (key.specificity(), *position))
            .map(|(_, (_, value))| value)
            .or(self.fallback.as_ref())
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &DatabaseInfo> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Number of product registrations, not counting the fallback.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.fallback.is_none()
    }
}

impl<T> Default for ProductRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProductRegistry<&'static str> {
        let mut registry = ProductRegistry::new();
        registry.set_fallback("generic");
        registry.register(DatabaseInfo::new("Microsoft SQL Server"), "mssql");
        registry.register(DatabaseInfo::new("Microsoft SQL Server").with_major(11), "mssql-2012");
        registry.register(DatabaseInfo::new("MySQL").with_version(8, 0), "mysql-8");
        registry
    }

    #[test]
    fn picks_most_specific_match() {
        let registry = registry();
        let sql_2019 = DatabaseInfo::new("Microsoft SQL Server").with_version(15, 0);
        let sql_2008 = DatabaseInfo::new("Microsoft SQL Server").with_version(10, 50);
        assert_eq!(registry.resolve(&sql_2019), Some(&"mssql-2012"));
        assert_eq!(registry.resolve(&sql_2008), Some(&"mssql"));
    }

    #[test]
    fn falls_back_when_nothing_matches() {
        let registry = registry();
        assert_eq!(registry.resolve(&DatabaseInfo::new("H2")), Some(&"generic"));
        assert_eq!(
            registry.resolve(&DatabaseInfo::new("MySQL").with_version(5, 7)),
            Some(&"generic")
        );
    }

    #[test]
    fn later_registration_replaces_equal_key() {
        let mut registry = registry();
        registry.register(DatabaseInfo::new("Microsoft SQL Server"), "mssql-custom");
        let sql_2008 = DatabaseInfo::new("Microsoft SQL Server").with_major(10);
        assert_eq!(registry.resolve(&sql_2008), Some(&"mssql-custom"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry: ProductRegistry<u8> = ProductRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.resolve(&DatabaseInfo::new("PostgreSQL")), None);
    }
}

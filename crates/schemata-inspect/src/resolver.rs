use std::fmt;
use std::sync::Arc;

use schemata_core::{DatabaseInfo, ObjectType};

use crate::inspector::Inspector;
use crate::registry::ProductRegistry;

/// Per-product inspectors of one object kind.
///
/// Product keys are [`DatabaseInfo`] values: a name prefix plus an optional
/// minimum version. The generic inspector answers for every product without
/// a matching registration.
pub struct InspectorResolver {
    object_type: ObjectType,
    registry: ProductRegistry<Arc<dyn Inspector>>,
}

impl InspectorResolver {
    /// Empty resolver for `object_type`.
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            registry: ProductRegistry::new(),
        }
    }

    /// Resolver answering with `inspector` for every product.
    pub fn generic(inspector: Arc<dyn Inspector>) -> Self {
        let mut resolver = Self::new(inspector.object_type());
        resolver.registry.set_fallback(inspector);
        resolver
    }

    /// Kind this resolver serves.
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Inspector used for products without their own registration.
    pub fn set_generic(&mut self, inspector: Arc<dyn Inspector>) {
        self.registry.set_fallback(inspector);
    }

    /// Inspector for `product`, taking priority over less specific ones.
    pub fn register(&mut self, product: DatabaseInfo, inspector: Arc<dyn Inspector>) {
        self.registry.register(product, inspector);
    }

    /// Inspector for `info`: the most specific product registration, else
    /// the generic one. `None` only when neither exists.
    pub fn resolve(&self, info: &DatabaseInfo) -> Option<Arc<dyn Inspector>> {
        self.registry.resolve(info).cloned()
    }

    /// Products with a dedicated inspector.
    pub fn products(&self) -> impl Iterator<Item = &DatabaseInfo> {
        self.registry.keys()
    }

    pub fn has_generic(&self) -> bool {
        self.registry.fallback().is_some()
    }
}

impl fmt::Debug for InspectorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectorResolver")
            .field("object_type", &self.object_type)
            .field("products", &self.products().map(ToString::to_string).collect::<Vec<_>>())
            .field("generic", &self.has_generic())
            .finish()
    }
}

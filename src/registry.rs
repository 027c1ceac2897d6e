//! Constructible-type registry consulted by Create rules.
//!
//! Maps a type name to a no-argument factory producing a fresh target
//! object. Registration order is preserved for stable listing output.

use indexmap::IndexMap;

use crate::binder::Target;

type Factory = Box<dyn Fn() -> Box<dyn Target> + Send + Sync>;

/// Registry of type name → no-arg constructor.
///
/// # Example
///
/// ```
/// use grafter::{Target, TypeRegistry};
///
/// #[derive(Default)]
/// struct EngineDescriptor { name: String }
/// grafter::impl_target!(EngineDescriptor);
///
/// let mut types = TypeRegistry::new();
/// types.register("EngineDescriptor", || Box::new(EngineDescriptor::default()));
/// assert!(types.has_type("EngineDescriptor"));
///
/// let obj = types.instantiate("EngineDescriptor").unwrap();
/// assert_eq!(obj.type_name(), "EngineDescriptor");
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    factories: IndexMap<String, Factory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a type name, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Target> + Send + Sync + 'static,
    ) -> &mut Self {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// True if a factory is registered under `name`.
    pub fn has_type(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Construct a fresh instance, or `None` for an unknown name.
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Target>> {
        self.factories.get(name).map(|f| f())
    }

    /// Registered type names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.factories.len()
    }
}

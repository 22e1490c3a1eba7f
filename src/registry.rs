//! Component type registry.
//!
//! Session documents name each node's type; restoring a document needs a
//! factory per type name producing a default instance to populate.

use std::collections::HashMap;

use tracing::debug;

use crate::descriptor::Component;
use crate::error::{Result, StateError};

/// Produces a default instance of one component type.
pub type ComponentFactory = fn() -> Box<dyn Component>;

#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    factories: HashMap<&'static str, ComponentFactory>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its type name. Re-registering a name replaces it.
    pub fn register<T: Component + Default>(&mut self) -> &mut Self {
        let type_name = T::default().type_name();
        self.register_factory(type_name, || Box::new(T::default()) as Box<dyn Component>)
    }

    pub fn register_factory(
        &mut self,
        type_name: &'static str,
        factory: ComponentFactory,
    ) -> &mut Self {
        if self.factories.insert(type_name, factory).is_some() {
            debug!("Component type {} re-registered", type_name);
        }
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<T: Component + Default>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn create(&self, type_name: &str) -> Result<Box<dyn Component>> {
        self.factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| StateError::UnknownType(type_name.to_string()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

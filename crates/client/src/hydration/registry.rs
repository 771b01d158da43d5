//! Package registry: the component implementations a page can hydrate.

use std::collections::HashMap;
use std::sync::Arc;

use dazzler_shared::ComponentDescriptor;

use super::LiveProps;
use crate::error::{DazzlerError, Result};

/// Host-side implementation of one component instance.
///
/// The engine owns the aspects; the implementation is told about them
/// whenever its wrapper re-renders.
pub trait Component: Send + Sync {
    fn render(&self, _aspects: &LiveProps) {}
}

/// Creates a component instance for a descriptor.
pub type ComponentFactory = Arc<dyn Fn(&ComponentDescriptor) -> Box<dyn Component> + Send + Sync>;

/// A named set of component factories.
#[derive(Clone)]
pub struct Package {
    pub name: String,
    components: HashMap<String, ComponentFactory>,
    fallback: Option<ComponentFactory>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: HashMap::new(),
            fallback: None,
        }
    }

    pub fn with_component<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ComponentDescriptor) -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.components.insert(name.into(), Arc::new(factory));
        self
    }

    /// Factory used for any component name not registered explicitly.
    pub fn with_fallback<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ComponentDescriptor) -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(factory));
        self
    }

    fn factory(&self, name: &str) -> Option<&ComponentFactory> {
        self.components.get(name).or(self.fallback.as_ref())
    }
}

/// Packages addressed by name.
#[derive(Clone, Default)]
pub struct PackageRegistry {
    packages: HashMap<String, Package>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, package: Package) {
        self.packages.insert(package.name.clone(), package);
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.register(package);
        self
    }

    /// Instantiate the implementation named by `descriptor`.
    pub fn instantiate(&self, descriptor: &ComponentDescriptor) -> Result<Box<dyn Component>> {
        let package = self
            .packages
            .get(&descriptor.package)
            .ok_or_else(|| DazzlerError::UnknownPackage(descriptor.package.clone()))?;
        let factory =
            package
                .factory(&descriptor.name)
                .ok_or_else(|| DazzlerError::UnknownComponent {
                    package: descriptor.package.clone(),
                    name: descriptor.name.clone(),
                })?;
        Ok(factory(descriptor))
    }
}

/// Component with no host behaviour.
pub struct Inert;

impl Component for Inert {}

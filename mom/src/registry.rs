//! Name-to-factory registries for collectors, controllers and hypervisor
//! interfaces.

use crate::collectors::CollectorFactory;
use crate::controllers::{self, ControllerFactory};
use crate::hypervisor::HypervisorFactory;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("unknown {kind} \"{name}\" (available: {available})")]
    Unknown {
        kind: &'static str,
        name: String,
        available: String,
    },
}

/// Maps configured plugin names to factories.
#[derive(Clone)]
pub struct PluginRegistry<F> {
    kind: &'static str,
    factories: IndexMap<String, F>,
}

impl<F> PluginRegistry<F> {
    pub fn new(kind: &'static str) -> Self {
        PluginRegistry {
            kind,
            factories: IndexMap::new(),
        }
    }

    /// Adds or replaces the factory for `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: F) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn get(&self, name: &str) -> Result<&F, PluginError> {
        self.factories
            .get(name)
            .ok_or_else(|| PluginError::Unknown {
                kind: self.kind,
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

/// Every registry the daemon draws from. Populate it once at startup and
/// then share it read-only.
#[derive(Clone)]
pub struct Plugins {
    pub collectors: PluginRegistry<CollectorFactory>,
    pub controllers: PluginRegistry<ControllerFactory>,
    pub hypervisors: PluginRegistry<HypervisorFactory>,
}

impl Plugins {
    /// Empty registries.
    pub fn new() -> Self {
        Plugins {
            collectors: PluginRegistry::new("collector"),
            controllers: PluginRegistry::new("controller"),
            hypervisors: PluginRegistry::new("hypervisor interface"),
        }
    }

    /// Registries holding the built-in `Balloon` and `KSM` controllers.
    pub fn with_defaults() -> Self {
        let mut plugins = Self::new();
        controllers::register_builtin(&mut plugins.controllers);
        plugins
    }
}

impl Default for Plugins {
    fn default() -> Self {
        Self::with_defaults()
    }
}

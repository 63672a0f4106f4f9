//! Static plugin factory registry.
//!
//! Plugins are compiled in and registered by name; the configuration
//! allow-list selects which factories instantiate. There is no
//! filesystem-based discovery or dynamic code loading.

use std::collections::HashMap;
use std::sync::Arc;

use super::builtin::AuditLoggerPlugin;
use super::traits::EventPlugin;

/// Factory producing one plugin instance from its configuration object.
pub type PluginFactory = fn(serde_json::Value) -> Arc<dyn EventPlugin>;

/// Name → factory map for all compiled-in plugins.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("audit-logger", |config| {
            Arc::new(AuditLoggerPlugin::new(config))
        });
        registry
    }

    /// Register a plugin factory under a unique name.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Instantiate the named plugin, if registered.
    pub fn create(&self, name: &str, config: serde_json::Value) -> Option<Arc<dyn EventPlugin>> {
        self.factories.get(name).map(|factory| factory(config))
    }

    /// Whether a factory exists for the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered factories.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

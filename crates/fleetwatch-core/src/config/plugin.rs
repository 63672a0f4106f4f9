//! Plugin system configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
///
/// Plugins are never auto-discovered: only names present in `allowlist`
/// are instantiated, and only when `enabled` is set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PluginConfig {
    /// Master switch for the plugin system.
    #[serde(default)]
    pub enabled: bool,
    /// Names of plugins permitted to load, in dispatch order.
    #[serde(default)]
    pub allowlist: Vec<String>,
    /// Per-plugin configuration objects, keyed by plugin name.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

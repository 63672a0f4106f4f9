//! Plugin manager — loads allow-listed plugins and fans events out to
//! their hooks, isolating every failure.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use fleetwatch_core::config::plugin::PluginConfig;
use fleetwatch_entity::event::Event;

use super::registry::PluginRegistry;
use super::traits::{EventPlugin, PluginContext};

/// One loaded plugin with its resolved context.
struct LoadedPlugin {
    name: String,
    plugin: Arc<dyn EventPlugin>,
    context: PluginContext,
}

/// Loads allow-listed plugins and routes every event to their hooks.
///
/// Dispatch order across plugins is allow-list order, fixed for the
/// process lifetime. A hook failure is logged and never halts the
/// remaining hooks or plugins.
pub struct PluginManager {
    enabled: bool,
    plugins: Vec<LoadedPlugin>,
}

impl PluginManager {
    /// A manager with the plugin system switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            plugins: Vec::new(),
        }
    }

    /// Instantiate every allow-listed plugin from the registry.
    ///
    /// An unknown name is logged and skipped so one bad entry never
    /// prevents the rest from loading. Missing or malformed per-plugin
    /// config defaults to an empty object with a warning.
    pub fn from_config(config: &PluginConfig, registry: &PluginRegistry) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        if config.allowlist.is_empty() {
            warn!("plugin system enabled but the allow-list is empty; no plugins will load");
            return Self {
                enabled: true,
                plugins: Vec::new(),
            };
        }

        let mut plugins = Vec::new();
        for name in &config.allowlist {
            let plugin_config = match config.config.get(name) {
                Some(value) if value.is_object() => value.clone(),
                Some(_) => {
                    warn!(plugin = %name, "plugin config is not an object; using empty config");
                    serde_json::Value::Object(serde_json::Map::new())
                }
                None => serde_json::Value::Object(serde_json::Map::new()),
            };

            match registry.create(name, plugin_config.clone()) {
                Some(plugin) => {
                    info!(plugin = %name, "plugin loaded");
                    plugins.push(LoadedPlugin {
                        name: name.clone(),
                        plugin,
                        context: PluginContext::new(plugin_config),
                    });
                }
                None => {
                    warn!(plugin = %name, "allow-listed plugin is not registered; skipping");
                }
            }
        }

        Self {
            enabled: true,
            plugins,
        }
    }

    /// Whether any plugin will receive events.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.plugins.is_empty()
    }

    /// Names of the loaded plugins, in dispatch order.
    pub fn loaded(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    /// Notify every plugin that the host has started.
    pub async fn notify_startup(&self) {
        for loaded in &self.plugins {
            if let Err(e) = loaded.plugin.on_startup(&loaded.context).await {
                error!(plugin = %loaded.name, error = %e, "plugin startup hook failed");
            }
        }
    }

    /// Notify every plugin that the host is shutting down.
    pub async fn notify_shutdown(&self) {
        for loaded in &self.plugins {
            if let Err(e) = loaded.plugin.on_shutdown().await {
                error!(plugin = %loaded.name, error = %e, "plugin shutdown hook failed");
            }
        }
    }

    /// Fan one event out to every loaded plugin.
    ///
    /// No-op beyond a boolean check when the manager is disabled or has
    /// no plugins. For each plugin: `on_event`, then the type-specific
    /// hook, then `on_audit_log` when the event carries an action.
    pub async fn dispatch_event(&self, event: &Event) {
        if !self.is_active() {
            return;
        }
        debug!(
            event_type = %event.event_type,
            plugins = self.plugins.len(),
            "dispatching event to plugins"
        );

        for loaded in &self.plugins {
            Self::run_hook(&loaded.name, event, loaded.plugin.on_event(event)).await;
            Self::route_specific(loaded, event).await;
            if event.is_audit_loggable() {
                Self::run_hook(&loaded.name, event, loaded.plugin.on_audit_log(event)).await;
            }
        }
    }

    /// Route the type-specific hook by event-type prefix.
    ///
    /// Prefix matching is deliberate: plugin routing is coarse-grained,
    /// unlike the webhook filter which matches exact types.
    async fn route_specific(loaded: &LoadedPlugin, event: &Event) {
        let plugin = &loaded.plugin;
        let event_type = event.event_type.as_str();

        if event_type.starts_with("task.created") {
            Self::run_hook(&loaded.name, event, plugin.on_task_created(event)).await;
        } else if event_type.starts_with("task.finished") || event_type.starts_with("task.failed")
        {
            Self::run_hook(&loaded.name, event, plugin.on_task_finished(event)).await;
        } else if event_type.starts_with("inventory.") {
            Self::run_hook(&loaded.name, event, plugin.on_inventory_collected(event)).await;
        } else if event_type.starts_with("alert.") {
            Self::run_hook(&loaded.name, event, plugin.on_alert(event)).await;
        } else if event_type.starts_with("server.status") {
            Self::run_hook(&loaded.name, event, plugin.on_server_status_changed(event)).await;
        }
    }

    async fn run_hook(
        plugin_name: &str,
        event: &Event,
        hook: impl Future<Output = Result<(), String>>,
    ) {
        if let Err(e) = hook.await {
            error!(
                plugin = %plugin_name,
                event_type = %event.event_type,
                event_id = %event.event_id,
                error = %e,
                "plugin hook failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every hook invocation; optionally fails `on_event`.
    #[derive(Debug, Default)]
    struct RecordingState {
        calls: Mutex<Vec<String>>,
    }

    struct RecordingPlugin {
        name: String,
        fail_on_event: bool,
        state: Arc<RecordingState>,
    }

    impl RecordingPlugin {
        fn record(&self, hook: &str) {
            self.state
                .calls
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, hook));
        }
    }

    #[async_trait]
    impl EventPlugin for RecordingPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        async fn on_event(&self, _event: &Event) -> Result<(), String> {
            self.record("on_event");
            if self.fail_on_event {
                Err("simulated plugin failure".to_string())
            } else {
                Ok(())
            }
        }

        async fn on_task_created(&self, _event: &Event) -> Result<(), String> {
            self.record("on_task_created");
            Ok(())
        }

        async fn on_alert(&self, _event: &Event) -> Result<(), String> {
            self.record("on_alert");
            Ok(())
        }

        async fn on_audit_log(&self, _event: &Event) -> Result<(), String> {
            self.record("on_audit_log");
            Ok(())
        }
    }

    fn manager_with(plugins: Vec<(&str, bool, Arc<RecordingState>)>) -> PluginManager {
        PluginManager {
            enabled: true,
            plugins: plugins
                .into_iter()
                .map(|(name, fail, state)| LoadedPlugin {
                    name: name.to_string(),
                    plugin: Arc::new(RecordingPlugin {
                        name: name.to_string(),
                        fail_on_event: fail,
                        state,
                    }) as Arc<dyn EventPlugin>,
                    context: PluginContext::new(serde_json::json!({})),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn failing_plugin_does_not_starve_the_next() {
        let state = Arc::new(RecordingState::default());
        let manager = manager_with(vec![
            ("broken", true, state.clone()),
            ("healthy", false, state.clone()),
        ]);

        manager.dispatch_event(&Event::new("task.created")).await;

        let calls = state.calls.lock().unwrap();
        assert!(calls.contains(&"healthy:on_event".to_string()));
        assert!(calls.contains(&"healthy:on_task_created".to_string()));
    }

    #[tokio::test]
    async fn hooks_run_in_documented_order() {
        let state = Arc::new(RecordingState::default());
        let manager = manager_with(vec![("p", false, state.clone())]);

        manager.dispatch_event(&Event::new("alert.triggered")).await;

        let calls = state.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "p:on_event".to_string(),
                "p:on_alert".to_string(),
                "p:on_audit_log".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn disabled_manager_dispatches_nothing() {
        let state = Arc::new(RecordingState::default());
        let mut manager = manager_with(vec![("p", false, state.clone())]);
        manager.enabled = false;

        manager.dispatch_event(&Event::new("task.created")).await;
        assert!(state.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_allowlist_entry_is_skipped() {
        let registry = PluginRegistry::with_builtins();
        let config = PluginConfig {
            enabled: true,
            allowlist: vec!["audit-logger".to_string(), "no-such-plugin".to_string()],
            config: HashMap::new(),
        };
        let manager = PluginManager::from_config(&config, &registry);
        assert_eq!(manager.loaded(), vec!["audit-logger"]);
    }

    #[test]
    fn empty_allowlist_loads_nothing() {
        let registry = PluginRegistry::with_builtins();
        let config = PluginConfig {
            enabled: true,
            allowlist: vec![],
            config: HashMap::new(),
        };
        let manager = PluginManager::from_config(&config, &registry);
        assert!(!manager.is_active());
    }

    #[test]
    fn malformed_plugin_config_defaults_to_empty() {
        let registry = PluginRegistry::with_builtins();
        let mut plugin_config = HashMap::new();
        plugin_config.insert(
            "audit-logger".to_string(),
            serde_json::Value::String("not an object".to_string()),
        );
        let config = PluginConfig {
            enabled: true,
            allowlist: vec!["audit-logger".to_string()],
            config: plugin_config,
        };
        let manager = PluginManager::from_config(&config, &registry);
        assert_eq!(manager.loaded(), vec!["audit-logger"]);
    }
}

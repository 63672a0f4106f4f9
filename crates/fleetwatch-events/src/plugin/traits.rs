//! Plugin capability trait.

use async_trait::async_trait;

use fleetwatch_entity::event::Event;

/// Context handed to a plugin at startup.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// The plugin's own configuration sub-object.
    pub config: serde_json::Value,
}

impl PluginContext {
    /// Create a context with the given plugin configuration.
    pub fn new(config: serde_json::Value) -> Self {
        Self { config }
    }
}

/// Capability set implemented by FleetWatch plugins.
///
/// Every hook is optional and defaults to a no-op. Hooks return
/// `Result<(), String>`; an `Err` is logged by the manager and never
/// affects other plugins or the host. For one event the manager calls
/// `on_event` first, then the type-specific hook, then `on_audit_log`.
#[async_trait]
pub trait EventPlugin: Send + Sync {
    /// Unique plugin name, matched against the configuration allow-list.
    fn name(&self) -> &str;

    /// Called once after loading, before any event is dispatched.
    async fn on_startup(&self, _ctx: &PluginContext) -> Result<(), String> {
        Ok(())
    }

    /// Called once during graceful shutdown.
    async fn on_shutdown(&self) -> Result<(), String> {
        Ok(())
    }

    /// Called for every dispatched event, before any specific hook.
    async fn on_event(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }

    /// Called for `task.created*` events.
    async fn on_task_created(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }

    /// Called for `task.finished*` and `task.failed*` events.
    async fn on_task_finished(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }

    /// Called for `inventory.*` events.
    async fn on_inventory_collected(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }

    /// Called for `alert.*` events.
    async fn on_alert(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }

    /// Called for `server.status*` events.
    async fn on_server_status_changed(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }

    /// Called for any event carrying a non-empty `action`, regardless of
    /// its type prefix.
    async fn on_audit_log(&self, _event: &Event) -> Result<(), String> {
        Ok(())
    }
}

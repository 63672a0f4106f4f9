//! Built-in plugins.

use async_trait::async_trait;
use tracing::info;

use fleetwatch_entity::event::Event;

use super::traits::{EventPlugin, PluginContext};

/// Emits a structured log line for every audit-loggable event.
///
/// Ships as the default registry entry; configuration may narrow it to a
/// set of event-type prefixes via `{"prefixes": ["task.", "alert."]}`.
#[derive(Debug)]
pub struct AuditLoggerPlugin {
    prefixes: Vec<String>,
}

impl AuditLoggerPlugin {
    /// Build the plugin from its configuration object.
    pub fn new(config: serde_json::Value) -> Self {
        let prefixes = config
            .get("prefixes")
            .and_then(|v| v.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self { prefixes }
    }

    fn matches(&self, event_type: &str) -> bool {
        self.prefixes.is_empty() || self.prefixes.iter().any(|p| event_type.starts_with(p))
    }
}

#[async_trait]
impl EventPlugin for AuditLoggerPlugin {
    fn name(&self) -> &str {
        "audit-logger"
    }

    async fn on_startup(&self, _ctx: &PluginContext) -> Result<(), String> {
        info!(prefixes = ?self.prefixes, "audit-logger plugin started");
        Ok(())
    }

    async fn on_audit_log(&self, event: &Event) -> Result<(), String> {
        if !self.matches(&event.event_type) {
            return Ok(());
        }
        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            action = %event.action,
            user = event.username.as_deref().unwrap_or("-"),
            server = event.server_name.as_deref().unwrap_or("-"),
            severity = %event.severity,
            "audit event"
        );
        Ok(())
    }
}

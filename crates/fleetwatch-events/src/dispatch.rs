//! Central event dispatch.
//!
//! Producers hand events to [`EventDispatcher::dispatch`] and move on.
//! The dispatcher fans out to plugins, writes auditable events through to
//! the audit log, and hands the event to the webhook dispatcher. Nothing
//! here ever returns an error to the producer.

use std::sync::Arc;

use tracing::{debug, error};

use fleetwatch_entity::audit::model::CreateAuditLogEntry;
use fleetwatch_entity::event::Event;

use crate::plugin::manager::PluginManager;
use crate::store::AuditStore;
use crate::webhook::dispatcher::WebhookDispatcher;

/// Fans events out to plugins, the audit log, and webhooks.
pub struct EventDispatcher {
    plugins: Arc<PluginManager>,
    webhooks: WebhookDispatcher,
    audit: Arc<dyn AuditStore>,
}

impl EventDispatcher {
    /// Wire the dispatch chain together.
    pub fn new(
        plugins: Arc<PluginManager>,
        webhooks: WebhookDispatcher,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            plugins,
            webhooks,
            audit,
        }
    }

    /// Dispatch one event through the full chain.
    ///
    /// Order is fixed: plugin hooks, then the audit write-through, then
    /// webhook delivery. A failure in any stage is logged and the
    /// remaining stages still run.
    pub async fn dispatch(&self, event: Event) {
        debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "dispatching event"
        );

        self.plugins.dispatch_event(&event).await;

        if event.is_audit_loggable() {
            if let Err(e) = self.audit.append(audit_entry_from(&event)).await {
                error!(
                    event_id = %event.event_id,
                    error = %e,
                    "audit write-through failed"
                );
            }
        }

        self.webhooks.dispatch(&event).await;
    }
}

/// Project an event onto an audit-log insert.
fn audit_entry_from(event: &Event) -> CreateAuditLogEntry {
    CreateAuditLogEntry {
        user_id: event.user_id,
        username: event.username.clone(),
        action: event.action.clone(),
        target_type: event.target_type.clone(),
        target_id: event.target_id.clone(),
        details: Some(event.meta.clone()),
        ip_address: event.ip.clone(),
        user_agent: event.user_agent.clone(),
    }
}

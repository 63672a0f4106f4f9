//! Canonical event record.
//!
//! An [`Event`] is the immutable record of "something happened" that flows
//! through the plugin manager and the webhook dispatcher. Construction
//! always succeeds; `event_id` and `timestamp` are generated here so no
//! caller can produce a partially-identified event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::severity::Severity;
use crate::audit::model::AuditLogEntry;

/// Canonical record of a system occurrence.
///
/// Events are created once and never mutated; they are passed by value
/// through the dispatch chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique event identifier.
    pub event_id: Uuid,
    /// Dotted type string, e.g. `"task.finished"`, `"alert.triggered"`.
    pub event_type: String,
    /// When the event was constructed (UTC).
    pub timestamp: DateTime<Utc>,
    /// Acting user identifier.
    pub user_id: Option<Uuid>,
    /// Acting username snapshot.
    pub username: Option<String>,
    /// Subject server identifier.
    pub server_id: Option<Uuid>,
    /// Subject server name snapshot.
    pub server_name: Option<String>,
    /// Generic subject kind, e.g. `"task"`.
    pub target_type: Option<String>,
    /// Generic subject identifier, e.g. `"task-123"`.
    pub target_id: Option<String>,
    /// Audit-log compatible action name, `event_type` with `.` → `_`.
    pub action: String,
    /// Event-specific payload.
    #[serde(default)]
    pub meta: serde_json::Value,
    /// Source IP of the originating request.
    pub ip: Option<String>,
    /// User agent of the originating request.
    pub user_agent: Option<String>,
    /// Event severity.
    #[serde(default)]
    pub severity: Severity,
}

impl Event {
    /// Create a new event of the given type.
    ///
    /// `event_id` and `timestamp` are always generated; `action` is derived
    /// from the type by replacing `.` with `_` for audit-log compatibility.
    pub fn new(event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        let action = event_type.replace('.', "_");
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            user_id: None,
            username: None,
            server_id: None,
            server_name: None,
            target_type: None,
            target_id: None,
            action,
            meta: serde_json::Value::Object(serde_json::Map::new()),
            ip: None,
            user_agent: None,
            severity: Severity::Info,
        }
    }

    /// Set the acting user.
    pub fn with_user(mut self, user_id: Uuid, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id);
        self.username = Some(username.into());
        self
    }

    /// Set the subject server.
    pub fn with_server(mut self, server_id: Uuid, server_name: impl Into<String>) -> Self {
        self.server_id = Some(server_id);
        self.server_name = Some(server_name.into());
        self
    }

    /// Set the generic subject reference.
    pub fn with_target(
        mut self,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id.into());
        self
    }

    /// Set the event-specific payload.
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }

    /// Set the request provenance.
    pub fn with_provenance(mut self, ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Rebuild an event from a legacy audit-log row for replay.
    ///
    /// The event type is derived from the stored action (`_` → `.`).
    /// Missing details become an empty object; a missing `created_at`
    /// defaults to the current time. Never fails.
    pub fn from_audit_entry(entry: &AuditLogEntry) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: entry.action.replace('_', "."),
            timestamp: entry.created_at.unwrap_or_else(Utc::now),
            user_id: entry.user_id,
            username: entry.username.clone(),
            server_id: None,
            server_name: None,
            target_type: entry.target_type.clone(),
            target_id: entry.target_id.clone(),
            action: entry.action.clone(),
            meta: entry
                .details
                .clone()
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            ip: entry.ip_address.clone(),
            user_agent: entry.user_agent.clone(),
            severity: Severity::Info,
        }
    }

    /// Whether this event should be written to the audit log.
    pub fn is_audit_loggable(&self) -> bool {
        !self.action.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_is_derived_from_event_type() {
        let event = Event::new("task.created");
        assert_eq!(event.action, "task_created");
        assert!(!event.event_id.is_nil());
    }

    #[test]
    fn consecutive_events_get_distinct_identities() {
        let a = Event::new("task.created");
        let b = Event::new("task.created");
        assert_ne!(a.event_id, b.event_id);
        assert!(b.timestamp >= a.timestamp);
    }

    #[test]
    fn audit_replay_tolerates_missing_fields() {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            user_id: None,
            username: None,
            action: "task_finished".to_string(),
            target_type: Some("task".to_string()),
            target_id: Some("task-9".to_string()),
            details: None,
            ip_address: None,
            user_agent: None,
            created_at: None,
        };
        let event = Event::from_audit_entry(&entry);
        assert_eq!(event.event_type, "task.finished");
        assert_eq!(event.meta, serde_json::json!({}));
        assert_eq!(event.target_id.as_deref(), Some("task-9"));
    }

    #[test]
    fn serialized_form_is_stable_json() {
        let event = Event::new("alert.triggered")
            .with_meta(serde_json::json!({"cpu": 97.5}))
            .with_severity(Severity::Critical);
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["event_type"], "alert.triggered");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["meta"]["cpu"], 97.5);
    }
}

//! Webhook registration entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Webhook {
    /// Unique webhook identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Target URL for deliveries.
    pub url: String,
    /// Shared secret for HMAC-SHA256 payload signing.
    pub secret: Option<String>,
    /// Whether deliveries are performed.
    pub enabled: bool,
    /// Subscribed event types; empty means all events.
    pub event_types: Vec<String>,
    /// Maximum delivery attempts per event.
    pub retry_max: i32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: i32,
    /// Last successful delivery time.
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// When the webhook was registered.
    pub created_at: DateTime<Utc>,
    /// When the webhook was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// Whether this webhook subscribes to the given event type.
    ///
    /// An empty filter subscribes to all events; otherwise the type must
    /// be an exact member of the filter set.
    pub fn is_interested_in(&self, event_type: &str) -> bool {
        self.event_types.is_empty() || self.event_types.iter().any(|t| t == event_type)
    }
}

/// Fields required to register a new webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWebhook {
    /// Display name.
    pub name: String,
    /// Target URL.
    pub url: String,
    /// Shared signing secret.
    pub secret: Option<String>,
    /// Subscribed event types; empty means all events.
    #[serde(default)]
    pub event_types: Vec<String>,
    /// Maximum delivery attempts.
    pub retry_max: Option<i32>,
    /// Per-request timeout in seconds.
    pub timeout_seconds: Option<i32>,
}

/// Fields that can be updated on an existing webhook.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateWebhook {
    /// New display name.
    pub name: Option<String>,
    /// New target URL.
    pub url: Option<String>,
    /// New signing secret.
    pub secret: Option<String>,
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New event-type filter.
    pub event_types: Option<Vec<String>>,
    /// New retry maximum.
    pub retry_max: Option<i32>,
    /// New timeout.
    pub timeout_seconds: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(event_types: Vec<String>) -> Webhook {
        Webhook {
            id: Uuid::new_v4(),
            name: "hook".to_string(),
            url: "https://example.com/hook".to_string(),
            secret: None,
            enabled: true,
            event_types,
            retry_max: 3,
            timeout_seconds: 10,
            last_triggered_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_subscribes_to_everything() {
        let hook = webhook(vec![]);
        assert!(hook.is_interested_in("task.finished"));
        assert!(hook.is_interested_in("alert.triggered"));
    }

    #[test]
    fn filter_requires_exact_match() {
        let hook = webhook(vec!["task.finished".to_string()]);
        assert!(hook.is_interested_in("task.finished"));
        assert!(!hook.is_interested_in("task.finished.partial"));
        assert!(!hook.is_interested_in("task.created"));
    }
}

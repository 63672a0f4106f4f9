//! Webhook delivery log entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Endpoint acknowledged with a 2xx response.
    Success,
    /// Terminal failure; no further attempts will be made.
    Failed,
    /// Transient failure; another attempt follows.
    Retrying,
}

impl DeliveryStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row per delivery attempt, append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeliveryLogEntry {
    /// Unique log row identifier.
    pub id: Uuid,
    /// Webhook the attempt targeted.
    pub webhook_id: Uuid,
    /// Event that was delivered.
    pub event_id: Uuid,
    /// Event type at delivery time.
    pub event_type: String,
    /// Attempt outcome.
    pub status: DeliveryStatus,
    /// HTTP status code if a response was received.
    pub status_code: Option<i32>,
    /// Truncated response body.
    pub response_body: Option<String>,
    /// Transport or validation error text.
    pub error: Option<String>,
    /// 1-based attempt number.
    pub attempt: i32,
    /// When the attempt was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data recorded for one delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeliveryLogEntry {
    /// Webhook the attempt targeted.
    pub webhook_id: Uuid,
    /// Event that was delivered.
    pub event_id: Uuid,
    /// Event type at delivery time.
    pub event_type: String,
    /// Attempt outcome.
    pub status: DeliveryStatus,
    /// HTTP status code if a response was received.
    pub status_code: Option<i32>,
    /// Truncated response body.
    pub response_body: Option<String>,
    /// Transport or validation error text.
    pub error: Option<String>,
    /// 1-based attempt number.
    pub attempt: i32,
}

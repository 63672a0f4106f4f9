//! Audit log entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Acting user (None for system-initiated actions).
    pub user_id: Option<Uuid>,
    /// Acting username snapshot.
    pub username: Option<String>,
    /// Action identifier, e.g. `"task_created"`.
    pub action: String,
    /// Kind of the affected object, e.g. `"task"`.
    pub target_type: Option<String>,
    /// Identifier of the affected object.
    pub target_id: Option<String>,
    /// Action-specific details (JSON).
    pub details: Option<serde_json::Value>,
    /// Source IP of the originating request.
    pub ip_address: Option<String>,
    /// User agent of the originating request.
    pub user_agent: Option<String>,
    /// When the entry was recorded. Legacy rows may lack this.
    pub created_at: Option<DateTime<Utc>>,
}

/// Data required to create an audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    /// Acting user.
    pub user_id: Option<Uuid>,
    /// Acting username snapshot.
    pub username: Option<String>,
    /// Action identifier.
    pub action: String,
    /// Kind of the affected object.
    pub target_type: Option<String>,
    /// Identifier of the affected object.
    pub target_id: Option<String>,
    /// Action-specific details.
    pub details: Option<serde_json::Value>,
    /// Source IP.
    pub ip_address: Option<String>,
    /// User agent.
    pub user_agent: Option<String>,
}

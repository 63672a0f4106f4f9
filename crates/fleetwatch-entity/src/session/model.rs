//! Terminal session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::SessionStatus;

/// An interactive terminal session against a managed server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TerminalSession {
    /// Unique session identifier.
    pub id: Uuid,
    /// Target server.
    pub server_id: Uuid,
    /// User holding the session.
    pub user_id: Uuid,
    /// Current session status.
    pub status: SessionStatus,
    /// When the session was opened.
    pub started_at: DateTime<Utc>,
    /// When the session was closed.
    pub ended_at: Option<DateTime<Utc>>,
}

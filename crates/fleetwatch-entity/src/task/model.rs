//! Remote task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::TaskStatus;

/// A command executed (or queued for execution) on a managed server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique task identifier.
    pub id: Uuid,
    /// Target server.
    pub server_id: Uuid,
    /// Shell command to execute.
    pub command: String,
    /// Current task status.
    pub status: TaskStatus,
    /// Captured standard output.
    pub stdout: Option<String>,
    /// Captured standard error.
    pub stderr: Option<String>,
    /// User who created the task.
    pub created_by: Option<Uuid>,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Target server.
    pub server_id: Uuid,
    /// Shell command to execute.
    pub command: String,
    /// User who created the task.
    pub created_by: Option<Uuid>,
}

//! Terminal session repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fleetwatch_core::error::{AppError, ErrorKind};
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::session::model::TerminalSession;
use fleetwatch_entity::session::status::SessionStatus;

/// Repository for terminal sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All sessions in a given state, oldest first.
    pub async fn find_by_status(&self, status: SessionStatus) -> AppResult<Vec<TerminalSession>> {
        sqlx::query_as::<_, TerminalSession>(
            "SELECT * FROM terminal_sessions WHERE status = $1 ORDER BY started_at",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list sessions by status", e)
        })
    }

    /// Interrupt an active session. Repeat-safe via the status guard.
    pub async fn mark_interrupted(&self, id: Uuid, ended_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE terminal_sessions SET status = 'interrupted', ended_at = $2 \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(id)
        .bind(ended_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to interrupt session", e)
        })?;
        Ok(())
    }
}

//! Remote task repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fleetwatch_core::error::{AppError, ErrorKind};
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::task::model::{CreateTask, Task};
use fleetwatch_entity::task::status::TaskStatus;

/// Repository for remote tasks.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Create a new task repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a task in the `pending` state.
    pub async fn create(&self, data: &CreateTask) -> AppResult<Task> {
        sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (server_id, command, created_by) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(data.server_id)
        .bind(&data.command)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create task", e))
    }

    /// Find a task by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Task>> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find task", e))
    }

    /// All tasks in a given state, oldest first.
    pub async fn find_by_status(&self, status: TaskStatus) -> AppResult<Vec<Task>> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE status = $1 ORDER BY created_at")
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list tasks by status", e)
            })
    }

    /// Interrupt a running task, appending a diagnostic line to stderr.
    ///
    /// The `status = 'running'` guard makes this safe to repeat.
    pub async fn mark_interrupted(
        &self,
        id: Uuid,
        finished_at: DateTime<Utc>,
        stderr_note: &str,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE tasks SET status = 'interrupted', finished_at = $2, \
               stderr = CASE WHEN stderr IS NULL OR stderr = '' THEN $3 \
                             ELSE stderr || E'\\n' || $3 END \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(finished_at)
        .bind(stderr_note)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to interrupt task", e))?;
        Ok(())
    }
}

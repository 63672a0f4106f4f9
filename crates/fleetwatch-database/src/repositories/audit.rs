//! Audit log repository.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fleetwatch_core::error::{AppError, ErrorKind};
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::audit::model::{AuditLogEntry, CreateAuditLogEntry};

/// Repository for audit log entries.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an audit entry.
    pub async fn create(&self, data: &CreateAuditLogEntry) -> AppResult<AuditLogEntry> {
        sqlx::query_as::<_, AuditLogEntry>(
            "INSERT INTO audit_log \
               (user_id, username, action, target_type, target_id, details, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(data.user_id)
        .bind(&data.username)
        .bind(&data.action)
        .bind(&data.target_type)
        .bind(&data.target_id)
        .bind(&data.details)
        .bind(&data.ip_address)
        .bind(&data.user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create audit entry", e))
    }

    /// Recent entries, optionally filtered by action and actor.
    pub async fn search(
        &self,
        action: Option<&str>,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> AppResult<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log \
             WHERE ($1::TEXT IS NULL OR action = $1) \
               AND ($2::UUID IS NULL OR user_id = $2) \
             ORDER BY created_at DESC LIMIT $3",
        )
        .bind(action)
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search audit log", e))
    }

    /// Count occurrences of an action since a specific time.
    pub async fn count_actions_since(
        &self,
        action: &str,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM audit_log WHERE action = $1 AND created_at >= $2",
        )
        .bind(action)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count audit actions", e)
        })
    }

    /// Drop entries older than the retention window.
    pub async fn delete_older_than(&self, days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(days);
        let result = sqlx::query("DELETE FROM audit_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to trim audit log", e)
            })?;
        Ok(result.rows_affected())
    }
}

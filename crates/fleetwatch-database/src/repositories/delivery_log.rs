//! Webhook delivery log repository. Append-only; one row per attempt.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fleetwatch_core::error::{AppError, ErrorKind};
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::webhook::delivery::{CreateDeliveryLogEntry, DeliveryLogEntry};

/// Repository for webhook delivery attempts.
#[derive(Debug, Clone)]
pub struct DeliveryLogRepository {
    pool: PgPool,
}

impl DeliveryLogRepository {
    /// Create a new delivery log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append one delivery attempt.
    pub async fn append(&self, data: &CreateDeliveryLogEntry) -> AppResult<DeliveryLogEntry> {
        sqlx::query_as::<_, DeliveryLogEntry>(
            "INSERT INTO webhook_deliveries \
               (webhook_id, event_id, event_type, status, status_code, response_body, error, attempt) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(data.webhook_id)
        .bind(data.event_id)
        .bind(&data.event_type)
        .bind(data.status)
        .bind(data.status_code)
        .bind(&data.response_body)
        .bind(&data.error)
        .bind(data.attempt)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record delivery attempt", e)
        })
    }

    /// Delivery history for one webhook, newest first.
    pub async fn find_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<DeliveryLogEntry>> {
        sqlx::query_as::<_, DeliveryLogEntry>(
            "SELECT * FROM webhook_deliveries WHERE webhook_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(webhook_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list delivery history", e)
        })
    }

    /// All attempts recorded for one event, oldest first.
    pub async fn find_by_event(&self, event_id: Uuid) -> AppResult<Vec<DeliveryLogEntry>> {
        sqlx::query_as::<_, DeliveryLogEntry>(
            "SELECT * FROM webhook_deliveries WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list event deliveries", e)
        })
    }

    /// Drop attempts older than the retention window.
    pub async fn delete_older_than(&self, days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(days);
        let result = sqlx::query("DELETE FROM webhook_deliveries WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to trim delivery log", e)
            })?;
        Ok(result.rows_affected())
    }
}

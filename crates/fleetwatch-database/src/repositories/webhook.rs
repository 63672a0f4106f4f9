//! Webhook registration repository.

use sqlx::PgPool;
use uuid::Uuid;

use fleetwatch_core::error::{AppError, ErrorKind};
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::webhook::model::{CreateWebhook, UpdateWebhook, Webhook};

/// Repository for webhook registrations.
#[derive(Debug, Clone)]
pub struct WebhookRepository {
    pool: PgPool,
}

impl WebhookRepository {
    /// Create a new webhook repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new webhook.
    pub async fn create(&self, data: &CreateWebhook) -> AppResult<Webhook> {
        sqlx::query_as::<_, Webhook>(
            "INSERT INTO webhooks (name, url, secret, event_types, retry_max, timeout_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.url)
        .bind(&data.secret)
        .bind(&data.event_types)
        .bind(data.retry_max.unwrap_or(3))
        .bind(data.timeout_seconds.unwrap_or(10))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create webhook", e))
    }

    /// Find a webhook by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Webhook>> {
        sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find webhook", e))
    }

    /// List all webhooks.
    pub async fn find_all(&self) -> AppResult<Vec<Webhook>> {
        sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list webhooks", e))
    }

    /// List webhooks that should receive deliveries.
    pub async fn find_enabled(&self) -> AppResult<Vec<Webhook>> {
        sqlx::query_as::<_, Webhook>("SELECT * FROM webhooks WHERE enabled ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list enabled webhooks", e)
            })
    }

    /// Apply a partial update; unset fields keep their current value.
    pub async fn update(&self, id: Uuid, data: &UpdateWebhook) -> AppResult<Webhook> {
        sqlx::query_as::<_, Webhook>(
            "UPDATE webhooks SET \
               name = COALESCE($2, name), \
               url = COALESCE($3, url), \
               secret = COALESCE($4, secret), \
               enabled = COALESCE($5, enabled), \
               event_types = COALESCE($6, event_types), \
               retry_max = COALESCE($7, retry_max), \
               timeout_seconds = COALESCE($8, timeout_seconds), \
               updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.url)
        .bind(&data.secret)
        .bind(data.enabled)
        .bind(&data.event_types)
        .bind(data.retry_max)
        .bind(data.timeout_seconds)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update webhook", e))?
        .ok_or_else(|| AppError::not_found("Webhook not found"))
    }

    /// Delete a webhook and its delivery history.
    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete webhook", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    /// Stamp the last successful delivery time.
    pub async fn touch_last_triggered(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE webhooks SET last_triggered_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to stamp webhook trigger", e)
            })?;
        Ok(())
    }
}

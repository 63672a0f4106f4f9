//! Storage collaborator traits consumed by the dispatch chain.
//!
//! The database crate provides the production implementations; tests use
//! in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use fleetwatch_core::result::AppResult;
use fleetwatch_entity::audit::model::CreateAuditLogEntry;
use fleetwatch_entity::webhook::delivery::CreateDeliveryLogEntry;
use fleetwatch_entity::webhook::model::Webhook;

/// Webhook registrations and delivery history.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// All currently-enabled webhooks, read fresh on every dispatch.
    async fn find_enabled(&self) -> AppResult<Vec<Webhook>>;

    /// Append one delivery-log row.
    async fn record_delivery(&self, entry: CreateDeliveryLogEntry) -> AppResult<()>;

    /// Update a webhook's last-triggered timestamp after a success.
    async fn touch_last_triggered(&self, webhook_id: Uuid) -> AppResult<()>;
}

/// Append-only audit log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one audit entry.
    async fn append(&self, entry: CreateAuditLogEntry) -> AppResult<()>;
}

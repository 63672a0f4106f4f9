//! Storage-trait adapters.
//!
//! The events and recovery crates define the traits they consume; these
//! adapters satisfy them on top of the concrete repositories so those
//! crates never see sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use fleetwatch_core::result::AppResult;
use fleetwatch_entity::audit::model::CreateAuditLogEntry;
use fleetwatch_entity::session::model::TerminalSession;
use fleetwatch_entity::session::status::SessionStatus;
use fleetwatch_entity::task::model::Task;
use fleetwatch_entity::task::status::TaskStatus;
use fleetwatch_entity::user::model::User;
use fleetwatch_entity::webhook::delivery::CreateDeliveryLogEntry;
use fleetwatch_entity::webhook::model::Webhook;
use fleetwatch_events::store::{AuditStore, WebhookStore};
use fleetwatch_recovery::store::{RecoverySessionStore, RecoveryTaskStore, RecoveryUserStore};
use fleetwatch_security::SecretVault;

use crate::repositories::audit::AuditLogRepository;
use crate::repositories::delivery_log::DeliveryLogRepository;
use crate::repositories::server::ServerRepository;
use crate::repositories::session::SessionRepository;
use crate::repositories::task::TaskRepository;
use crate::repositories::user::UserRepository;
use crate::repositories::webhook::WebhookRepository;

/// All repositories over one shared pool.
#[derive(Clone)]
pub struct Repositories {
    /// Webhook registrations.
    pub webhooks: WebhookRepository,
    /// Delivery attempt history.
    pub deliveries: DeliveryLogRepository,
    /// Remote tasks.
    pub tasks: TaskRepository,
    /// Terminal sessions.
    pub sessions: SessionRepository,
    /// Audit log.
    pub audit: AuditLogRepository,
    /// User accounts.
    pub users: UserRepository,
    /// Managed servers.
    pub servers: ServerRepository,
}

impl Repositories {
    /// Build every repository over the given pool.
    pub fn new(pool: PgPool, vault: Arc<SecretVault>) -> Self {
        Self {
            webhooks: WebhookRepository::new(pool.clone()),
            deliveries: DeliveryLogRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            audit: AuditLogRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            servers: ServerRepository::new(pool, vault),
        }
    }
}

/// [`WebhookStore`] over the webhook and delivery repositories.
#[derive(Clone)]
pub struct PgWebhookStore {
    webhooks: WebhookRepository,
    deliveries: DeliveryLogRepository,
}

impl PgWebhookStore {
    /// Build from the shared repository set.
    pub fn new(repos: &Repositories) -> Self {
        Self {
            webhooks: repos.webhooks.clone(),
            deliveries: repos.deliveries.clone(),
        }
    }
}

#[async_trait]
impl WebhookStore for PgWebhookStore {
    async fn find_enabled(&self) -> AppResult<Vec<Webhook>> {
        self.webhooks.find_enabled().await
    }

    async fn record_delivery(&self, entry: CreateDeliveryLogEntry) -> AppResult<()> {
        self.deliveries.append(&entry).await?;
        Ok(())
    }

    async fn touch_last_triggered(&self, webhook_id: Uuid) -> AppResult<()> {
        self.webhooks.touch_last_triggered(webhook_id).await
    }
}

/// [`AuditStore`] over the audit repository.
#[derive(Clone)]
pub struct PgAuditStore {
    audit: AuditLogRepository,
}

impl PgAuditStore {
    /// Build from the shared repository set.
    pub fn new(repos: &Repositories) -> Self {
        Self {
            audit: repos.audit.clone(),
        }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: CreateAuditLogEntry) -> AppResult<()> {
        self.audit.create(&entry).await?;
        Ok(())
    }
}

/// Recovery-side task store.
#[derive(Clone)]
pub struct PgTaskStore {
    tasks: TaskRepository,
}

impl PgTaskStore {
    /// Build from the shared repository set.
    pub fn new(repos: &Repositories) -> Self {
        Self {
            tasks: repos.tasks.clone(),
        }
    }
}

#[async_trait]
impl RecoveryTaskStore for PgTaskStore {
    async fn find_running(&self) -> AppResult<Vec<Task>> {
        self.tasks.find_by_status(TaskStatus::Running).await
    }

    async fn mark_interrupted(
        &self,
        task_id: Uuid,
        finished_at: DateTime<Utc>,
        stderr_note: &str,
    ) -> AppResult<()> {
        self.tasks
            .mark_interrupted(task_id, finished_at, stderr_note)
            .await
    }
}

/// Recovery-side session store.
#[derive(Clone)]
pub struct PgSessionStore {
    sessions: SessionRepository,
}

impl PgSessionStore {
    /// Build from the shared repository set.
    pub fn new(repos: &Repositories) -> Self {
        Self {
            sessions: repos.sessions.clone(),
        }
    }
}

#[async_trait]
impl RecoverySessionStore for PgSessionStore {
    async fn find_active(&self) -> AppResult<Vec<TerminalSession>> {
        self.sessions.find_by_status(SessionStatus::Active).await
    }

    async fn mark_interrupted(&self, session_id: Uuid, ended_at: DateTime<Utc>) -> AppResult<()> {
        self.sessions.mark_interrupted(session_id, ended_at).await
    }
}

/// Recovery-side user lookup.
#[derive(Clone)]
pub struct PgUserStore {
    users: UserRepository,
}

impl PgUserStore {
    /// Build from the shared repository set.
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
        }
    }
}

#[async_trait]
impl RecoveryUserStore for PgUserStore {
    async fn find_first_admin(&self) -> AppResult<Option<User>> {
        self.users.find_first_admin().await
    }
}

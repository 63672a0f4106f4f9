//! Storage collaborator traits for the recovery pass.
//!
//! Implemented by the database crate in production and by in-memory
//! fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use fleetwatch_core::result::AppResult;
use fleetwatch_entity::session::model::TerminalSession;
use fleetwatch_entity::task::model::Task;
use fleetwatch_entity::user::model::User;

/// Task rows as seen by recovery.
#[async_trait]
pub trait RecoveryTaskStore: Send + Sync {
    /// All tasks currently in the `running` state.
    async fn find_running(&self) -> AppResult<Vec<Task>>;

    /// Move one task to `interrupted`, stamping `finished_at` and
    /// appending a diagnostic line to its stderr.
    async fn mark_interrupted(
        &self,
        task_id: Uuid,
        finished_at: DateTime<Utc>,
        stderr_note: &str,
    ) -> AppResult<()>;
}

/// Terminal session rows as seen by recovery.
#[async_trait]
pub trait RecoverySessionStore: Send + Sync {
    /// All sessions currently in the `active` state.
    async fn find_active(&self) -> AppResult<Vec<TerminalSession>>;

    /// Move one session to `interrupted`, stamping `ended_at`.
    async fn mark_interrupted(&self, session_id: Uuid, ended_at: DateTime<Utc>) -> AppResult<()>;
}

/// User lookup for attributing the recovery audit event.
#[async_trait]
pub trait RecoveryUserStore: Send + Sync {
    /// The oldest administrator account, if any exists.
    async fn find_first_admin(&self) -> AppResult<Option<User>>;
}

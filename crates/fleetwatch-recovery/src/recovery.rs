//! The startup recovery pass.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use fleetwatch_core::config::recovery::RecoveryConfig;
use fleetwatch_entity::event::Event;
use fleetwatch_events::EventDispatcher;

use crate::store::{RecoverySessionStore, RecoveryTaskStore, RecoveryUserStore};

/// Diagnostic line appended to the stderr of every recovered task.
const INTERRUPTED_NOTE: &str =
    "Task interrupted: the FleetWatch server restarted while this task was running";

/// Outcome of one recovery pass, suitable for startup logs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoverySummary {
    /// Running tasks examined.
    pub tasks_examined: usize,
    /// Tasks moved to `interrupted`.
    pub tasks_recovered: usize,
    /// Active sessions examined.
    pub sessions_examined: usize,
    /// Sessions moved to `interrupted`.
    pub sessions_recovered: usize,
    /// Systemic storage failure, if the pass could not complete.
    pub error: Option<String>,
}

/// Reconciles orphaned tasks and sessions once at process startup.
///
/// Best-effort by contract: `run` never returns an error, so a broken
/// table cannot gate startup. Failures land in the summary instead.
pub struct StartupRecovery {
    tasks: Arc<dyn RecoveryTaskStore>,
    sessions: Arc<dyn RecoverySessionStore>,
    users: Arc<dyn RecoveryUserStore>,
    dispatcher: Arc<EventDispatcher>,
    config: RecoveryConfig,
}

impl StartupRecovery {
    /// Wire the pass against its storage collaborators.
    pub fn new(
        tasks: Arc<dyn RecoveryTaskStore>,
        sessions: Arc<dyn RecoverySessionStore>,
        users: Arc<dyn RecoveryUserStore>,
        dispatcher: Arc<EventDispatcher>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            tasks,
            sessions,
            users,
            dispatcher,
            config,
        }
    }

    /// Run the pass to completion and return its summary.
    pub async fn run(&self) -> RecoverySummary {
        let mut summary = RecoverySummary::default();

        self.recover_tasks(&mut summary).await;
        self.recover_sessions(&mut summary).await;

        if summary.tasks_recovered > 0 {
            self.emit_recovery_event(&summary).await;
        }

        info!(
            tasks_examined = summary.tasks_examined,
            tasks_recovered = summary.tasks_recovered,
            sessions_examined = summary.sessions_examined,
            sessions_recovered = summary.sessions_recovered,
            error = summary.error.as_deref().unwrap_or("none"),
            "startup recovery finished"
        );
        summary
    }

    /// Interrupt every running task whose start time is missing or older
    /// than the stale threshold. Idempotent: recovered tasks leave the
    /// `running` state, so a second pass finds nothing.
    async fn recover_tasks(&self, summary: &mut RecoverySummary) {
        let running = match self.tasks.find_running().await {
            Ok(running) => running,
            Err(e) => {
                warn!(error = %e, "task recovery could not list running tasks");
                record_error(summary, format!("task recovery failed: {e}"));
                return;
            }
        };
        summary.tasks_examined = running.len();

        let now = Utc::now();
        let threshold = Duration::minutes(self.config.stale_task_threshold_minutes);
        for task in running {
            let stale = task
                .started_at
                .is_none_or(|started| now - started > threshold);
            if !stale {
                continue;
            }
            match self
                .tasks
                .mark_interrupted(task.id, now, INTERRUPTED_NOTE)
                .await
            {
                Ok(()) => {
                    summary.tasks_recovered += 1;
                    info!(task_id = %task.id, server_id = %task.server_id, "stale task interrupted");
                }
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "failed to interrupt stale task; skipping");
                }
            }
        }
    }

    /// Interrupt every active session. No threshold: an interactive
    /// session cannot survive a process restart.
    async fn recover_sessions(&self, summary: &mut RecoverySummary) {
        let active = match self.sessions.find_active().await {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "session recovery could not list active sessions");
                record_error(summary, format!("session recovery failed: {e}"));
                return;
            }
        };
        summary.sessions_examined = active.len();

        let now = Utc::now();
        for session in active {
            match self.sessions.mark_interrupted(session.id, now).await {
                Ok(()) => {
                    summary.sessions_recovered += 1;
                    info!(session_id = %session.id, "orphaned session interrupted");
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "failed to interrupt session; skipping");
                }
            }
        }
    }

    /// Emit one `task.recover` event summarizing the pass, attributed to
    /// the first admin or the nil-UUID "system" sentinel.
    async fn emit_recovery_event(&self, summary: &RecoverySummary) {
        let (user_id, username) = match self.users.find_first_admin().await {
            Ok(Some(admin)) => (admin.id, admin.username),
            Ok(None) => (Uuid::nil(), "system".to_string()),
            Err(e) => {
                warn!(error = %e, "admin lookup failed; attributing recovery to system");
                (Uuid::nil(), "system".to_string())
            }
        };

        let event = Event::new("task.recover")
            .with_user(user_id, username)
            .with_target("task", "startup-recovery")
            .with_meta(serde_json::json!({
                "recovered": summary.tasks_recovered,
                "examined": summary.tasks_examined,
            }));
        self.dispatcher.dispatch(event).await;
    }
}

fn record_error(summary: &mut RecoverySummary, message: String) {
    summary.error = Some(match summary.error.take() {
        Some(existing) => format!("{existing}; {message}"),
        None => message,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Mutex;

    use fleetwatch_core::config::webhook::WebhookConfig;
    use fleetwatch_core::error::AppError;
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
    use fleetwatch_events::{PluginManager, WebhookDispatcher};

    #[derive(Default)]
    struct MemoryTasks {
        tasks: Mutex<Vec<Task>>,
        fail_ids: Vec<Uuid>,
        fail_listing: bool,
    }

    #[async_trait]
    impl RecoveryTaskStore for MemoryTasks {
        async fn find_running(&self) -> AppResult<Vec<Task>> {
            if self.fail_listing {
                return Err(AppError::database("simulated outage"));
            }
            Ok(self
                .tasks
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.status == TaskStatus::Running)
                .cloned()
                .collect())
        }

        async fn mark_interrupted(
            &self,
            task_id: Uuid,
            finished_at: DateTime<Utc>,
            stderr_note: &str,
        ) -> AppResult<()> {
            if self.fail_ids.contains(&task_id) {
                return Err(AppError::database("simulated row failure"));
            }
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| AppError::not_found("no such task"))?;
            task.status = TaskStatus::Interrupted;
            task.finished_at = Some(finished_at);
            task.stderr = Some(match task.stderr.take() {
                Some(existing) => format!("{existing}\n{stderr_note}"),
                None => stderr_note.to_string(),
            });
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySessions {
        sessions: Mutex<Vec<TerminalSession>>,
    }

    #[async_trait]
    impl RecoverySessionStore for MemorySessions {
        async fn find_active(&self) -> AppResult<Vec<TerminalSession>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.status == SessionStatus::Active)
                .cloned()
                .collect())
        }

        async fn mark_interrupted(
            &self,
            session_id: Uuid,
            ended_at: DateTime<Utc>,
        ) -> AppResult<()> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or_else(|| AppError::not_found("no such session"))?;
            session.status = SessionStatus::Interrupted;
            session.ended_at = Some(ended_at);
            Ok(())
        }
    }

    struct MemoryUsers {
        admin: Option<User>,
    }

    #[async_trait]
    impl RecoveryUserStore for MemoryUsers {
        async fn find_first_admin(&self) -> AppResult<Option<User>> {
            Ok(self.admin.clone())
        }
    }

    #[derive(Default)]
    struct MemoryAudit {
        entries: Mutex<Vec<CreateAuditLogEntry>>,
    }

    #[async_trait]
    impl AuditStore for MemoryAudit {
        async fn append(&self, entry: CreateAuditLogEntry) -> AppResult<()> {
            self.entries.lock().unwrap().push(entry);
            Ok(())
        }
    }

    struct EmptyWebhooks;

    #[async_trait]
    impl WebhookStore for EmptyWebhooks {
        async fn find_enabled(&self) -> AppResult<Vec<Webhook>> {
            Ok(vec![])
        }

        async fn record_delivery(&self, _entry: CreateDeliveryLogEntry) -> AppResult<()> {
            Ok(())
        }

        async fn touch_last_triggered(&self, _webhook_id: Uuid) -> AppResult<()> {
            Ok(())
        }
    }

    fn running_task(minutes_ago: Option<i64>) -> Task {
        Task {
            id: Uuid::new_v4(),
            server_id: Uuid::new_v4(),
            command: "sleep 1000".to_string(),
            status: TaskStatus::Running,
            stdout: None,
            stderr: None,
            created_by: None,
            started_at: minutes_ago.map(|m| Utc::now() - Duration::minutes(m)),
            finished_at: None,
            created_at: Utc::now() - Duration::hours(2),
        }
    }

    fn active_session() -> TerminalSession {
        TerminalSession {
            id: Uuid::new_v4(),
            server_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: SessionStatus::Active,
            started_at: Utc::now() - Duration::minutes(10),
            ended_at: None,
        }
    }

    struct Harness {
        tasks: Arc<MemoryTasks>,
        sessions: Arc<MemorySessions>,
        audit: Arc<MemoryAudit>,
        recovery: StartupRecovery,
    }

    fn harness(tasks: MemoryTasks, sessions: MemorySessions, admin: Option<User>) -> Harness {
        let tasks = Arc::new(tasks);
        let sessions = Arc::new(sessions);
        let audit = Arc::new(MemoryAudit::default());
        let webhooks = WebhookDispatcher::new(Arc::new(EmptyWebhooks), WebhookConfig::default())
            .expect("dispatcher");
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::new(PluginManager::disabled()),
            webhooks,
            audit.clone(),
        ));
        let recovery = StartupRecovery::new(
            tasks.clone(),
            sessions.clone(),
            Arc::new(MemoryUsers { admin }),
            dispatcher,
            RecoveryConfig::default(),
        );
        Harness {
            tasks,
            sessions,
            audit,
            recovery,
        }
    }

    #[tokio::test]
    async fn stale_and_unstamped_tasks_are_interrupted_fresh_ones_kept() {
        let store = MemoryTasks::default();
        let stale = running_task(Some(90));
        let fresh = running_task(Some(10));
        let unstamped = running_task(None);
        {
            let mut tasks = store.tasks.lock().unwrap();
            tasks.push(stale.clone());
            tasks.push(fresh.clone());
            tasks.push(unstamped.clone());
        }
        let h = harness(store, MemorySessions::default(), None);

        let summary = h.recovery.run().await;

        assert_eq!(summary.tasks_examined, 3);
        assert_eq!(summary.tasks_recovered, 2);
        let tasks = h.tasks.tasks.lock().unwrap();
        let by_id = |id: Uuid| tasks.iter().find(|t| t.id == id).unwrap().clone();
        assert_eq!(by_id(stale.id).status, TaskStatus::Interrupted);
        assert_eq!(by_id(unstamped.id).status, TaskStatus::Interrupted);
        assert_eq!(by_id(fresh.id).status, TaskStatus::Running);
        assert!(by_id(stale.id).finished_at.is_some());
        assert!(
            by_id(stale.id)
                .stderr
                .unwrap_or_default()
                .contains("server restarted")
        );
    }

    #[tokio::test]
    async fn second_pass_finds_nothing_to_recover() {
        let store = MemoryTasks::default();
        store.tasks.lock().unwrap().push(running_task(Some(120)));
        let h = harness(store, MemorySessions::default(), None);

        let first = h.recovery.run().await;
        assert_eq!(first.tasks_recovered, 1);

        let second = h.recovery.run().await;
        assert_eq!(second.tasks_examined, 0);
        assert_eq!(second.tasks_recovered, 0);
    }

    #[tokio::test]
    async fn active_sessions_are_interrupted_without_a_threshold() {
        let sessions = MemorySessions::default();
        sessions.sessions.lock().unwrap().push(active_session());
        sessions.sessions.lock().unwrap().push(active_session());
        let h = harness(MemoryTasks::default(), sessions, None);

        let summary = h.recovery.run().await;

        assert_eq!(summary.sessions_examined, 2);
        assert_eq!(summary.sessions_recovered, 2);
        let sessions = h.sessions.sessions.lock().unwrap();
        assert!(
            sessions
                .iter()
                .all(|s| s.status == SessionStatus::Interrupted && s.ended_at.is_some())
        );
    }

    #[tokio::test]
    async fn recovery_event_falls_back_to_the_system_sentinel() {
        let store = MemoryTasks::default();
        store.tasks.lock().unwrap().push(running_task(Some(90)));
        let h = harness(store, MemorySessions::default(), None);

        h.recovery.run().await;

        let entries = h.audit.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "task_recover");
        assert_eq!(entries[0].user_id, Some(Uuid::nil()));
        assert_eq!(entries[0].username.as_deref(), Some("system"));
        let details = entries[0].details.clone().unwrap();
        assert_eq!(details["recovered"], 1);
        assert_eq!(details["examined"], 1);
    }

    #[tokio::test]
    async fn recovery_event_is_attributed_to_the_first_admin() {
        let store = MemoryTasks::default();
        store.tasks.lock().unwrap().push(running_task(None));
        let admin = User {
            id: Uuid::new_v4(),
            username: "root-admin".to_string(),
            is_admin: true,
            created_at: Utc::now(),
        };
        let h = harness(store, MemorySessions::default(), Some(admin.clone()));

        h.recovery.run().await;

        let entries = h.audit.entries.lock().unwrap();
        assert_eq!(entries[0].user_id, Some(admin.id));
        assert_eq!(entries[0].username.as_deref(), Some("root-admin"));
    }

    #[tokio::test]
    async fn no_event_when_nothing_was_recovered() {
        let store = MemoryTasks::default();
        store.tasks.lock().unwrap().push(running_task(Some(5)));
        let h = harness(store, MemorySessions::default(), None);

        let summary = h.recovery.run().await;

        assert_eq!(summary.tasks_recovered, 0);
        assert!(h.audit.entries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_bad_row_does_not_halt_the_pass() {
        let mut store = MemoryTasks::default();
        let poisoned = running_task(Some(90));
        let healthy = running_task(Some(90));
        store.fail_ids = vec![poisoned.id];
        {
            let mut tasks = store.tasks.lock().unwrap();
            tasks.push(poisoned);
            tasks.push(healthy.clone());
        }
        let h = harness(store, MemorySessions::default(), None);

        let summary = h.recovery.run().await;

        assert_eq!(summary.tasks_examined, 2);
        assert_eq!(summary.tasks_recovered, 1);
        assert!(summary.error.is_none());
        let tasks = h.tasks.tasks.lock().unwrap();
        assert_eq!(
            tasks.iter().find(|t| t.id == healthy.id).unwrap().status,
            TaskStatus::Interrupted
        );
    }

    #[tokio::test]
    async fn systemic_failure_is_reported_without_gating_startup() {
        let store = MemoryTasks {
            fail_listing: true,
            ..MemoryTasks::default()
        };
        let sessions = MemorySessions::default();
        sessions.sessions.lock().unwrap().push(active_session());
        let h = harness(store, sessions, None);

        let summary = h.recovery.run().await;

        assert!(summary.error.as_deref().unwrap().contains("task recovery failed"));
        // Sessions are still reconciled despite the task-side outage.
        assert_eq!(summary.sessions_recovered, 1);
    }
}

//! Startup recovery and audit retention configuration.

use serde::{Deserialize, Serialize};

/// Startup recovery and audit retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Minutes after which a `running` task is considered orphaned.
    #[serde(default = "default_stale_threshold")]
    pub stale_task_threshold_minutes: i64,
    /// Days to retain audit log entries.
    #[serde(default = "default_retention_days")]
    pub audit_retention_days: i64,
    /// Hours between audit retention sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub audit_cleanup_interval_hours: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            stale_task_threshold_minutes: default_stale_threshold(),
            audit_retention_days: default_retention_days(),
            audit_cleanup_interval_hours: default_cleanup_interval(),
        }
    }
}

fn default_stale_threshold() -> i64 {
    60
}

fn default_retention_days() -> i64 {
    90
}

fn default_cleanup_interval() -> u64 {
    24
}

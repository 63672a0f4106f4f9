//! # fleetwatch-recovery
//!
//! Startup reconciliation. An ungraceful shutdown leaves tasks stuck in
//! `running` and terminal sessions stuck in `active`; the recovery pass
//! runs once before request serving starts and moves those records to
//! `interrupted` so the fleet state is consistent again.

pub mod recovery;
pub mod store;

pub use recovery::{RecoverySummary, StartupRecovery};
pub use store::{RecoverySessionStore, RecoveryTaskStore, RecoveryUserStore};

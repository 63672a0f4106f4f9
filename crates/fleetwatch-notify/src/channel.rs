//! Alert channel contract.

use async_trait::async_trait;
use uuid::Uuid;

use fleetwatch_entity::event::severity::Severity;

/// One triggered alert, as handed to every channel adapter.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    /// Server the alert concerns, when known.
    pub server_id: Option<Uuid>,
    /// Server display name.
    pub server_name: String,
    /// Alert kind, e.g. `"cpu_high"`, `"disk_full"`.
    pub alert_type: String,
    /// Human-readable description.
    pub message: String,
    /// Alert severity.
    pub severity: Severity,
}

/// Outcome of one channel's delivery attempt.
#[derive(Debug, Clone)]
pub struct ChannelResult {
    /// Channel name, e.g. `"email"`.
    pub channel: String,
    /// Whether the channel accepted the alert.
    pub success: bool,
    /// Failure detail when `success` is false.
    pub error: Option<String>,
}

impl ChannelResult {
    /// A successful delivery on the named channel.
    pub fn ok(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            success: true,
            error: None,
        }
    }

    /// A failed delivery on the named channel.
    pub fn failed(channel: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// A notification sink for triggered alerts.
///
/// Adapters never panic and never propagate errors; a failure is reported
/// in the [`ChannelResult`] so the manager can fan out to the remaining
/// channels regardless.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Stable channel name used in logs and results.
    fn name(&self) -> &str;

    /// Whether the channel's configuration makes it usable.
    fn enabled(&self) -> bool;

    /// Deliver one alert.
    async fn send_alert(&self, alert: &AlertMessage) -> ChannelResult;
}

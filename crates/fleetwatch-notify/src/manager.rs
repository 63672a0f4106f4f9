//! Alert fan-out manager.

use std::sync::Arc;

use tracing::{info, warn};

use fleetwatch_core::config::alerts::AlertsConfig;
use fleetwatch_core::result::AppResult;
use fleetwatch_entity::event::Event;
use fleetwatch_events::EventDispatcher;

use crate::channel::{AlertChannel, AlertMessage, ChannelResult};
use crate::channels::email::EmailChannel;
use crate::channels::slack::SlackChannel;
use crate::channels::telegram::TelegramChannel;

/// Fans a triggered alert out to every enabled channel.
///
/// Channel failures are independent; one broken adapter never blocks the
/// others. After fan-out an `alert.triggered` event goes through the
/// dispatcher so plugins and webhooks observe the alert too.
pub struct AlertManager {
    channels: Vec<Arc<dyn AlertChannel>>,
    dispatcher: Arc<EventDispatcher>,
}

impl AlertManager {
    /// Construct the standard channel set from configuration.
    pub fn from_config(
        config: &AlertsConfig,
        dispatcher: Arc<EventDispatcher>,
    ) -> AppResult<Self> {
        let channels: Vec<Arc<dyn AlertChannel>> = vec![
            Arc::new(EmailChannel::new(config.email.clone())?),
            Arc::new(TelegramChannel::new(config.telegram.clone())),
            Arc::new(SlackChannel::new(config.slack.clone())),
        ];
        Ok(Self::new(channels, dispatcher))
    }

    /// Construct from an explicit channel set.
    pub fn new(channels: Vec<Arc<dyn AlertChannel>>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            channels,
            dispatcher,
        }
    }

    /// Names of the channels that will receive alerts.
    pub fn enabled_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.enabled())
            .map(|c| c.name())
            .collect()
    }

    /// Deliver one alert to every enabled channel and emit the event.
    pub async fn send_alert(&self, alert: AlertMessage) -> Vec<ChannelResult> {
        let mut results = Vec::new();
        for channel in self.channels.iter().filter(|c| c.enabled()) {
            let result = channel.send_alert(&alert).await;
            if result.success {
                info!(channel = %result.channel, alert_type = %alert.alert_type, "alert delivered");
            } else {
                warn!(
                    channel = %result.channel,
                    alert_type = %alert.alert_type,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "alert channel failed"
                );
            }
            results.push(result);
        }

        let delivered = results.iter().filter(|r| r.success).count();
        let mut event = Event::new("alert.triggered")
            .with_severity(alert.severity)
            .with_target("alert", &alert.alert_type)
            .with_meta(serde_json::json!({
                "alert_type": alert.alert_type,
                "message": alert.message,
                "server_name": alert.server_name,
                "channels_delivered": delivered,
                "channels_failed": results.len() - delivered,
            }));
        if let Some(server_id) = alert.server_id {
            event = event.with_server(server_id, &alert.server_name);
        }
        self.dispatcher.dispatch(event).await;

        results
    }
}

//! Slack incoming-webhook alert channel.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use fleetwatch_core::config::alerts::SlackConfig;

use crate::channel::{AlertChannel, AlertMessage, ChannelResult};
use crate::channels::render_text;

const CHANNEL_NAME: &str = "slack";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts alerts to a Slack incoming webhook.
pub struct SlackChannel {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Build the channel from its config section.
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    fn enabled(&self) -> bool {
        self.config.enabled && !self.config.webhook_url.is_empty()
    }

    async fn send_alert(&self, alert: &AlertMessage) -> ChannelResult {
        if !self.enabled() {
            return ChannelResult::failed(CHANNEL_NAME, "channel is not configured");
        }

        let payload = serde_json::json!({ "text": render_text(alert) });

        match self
            .client
            .post(&self.config.webhook_url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(alert_type = %alert.alert_type, "alert sent to Slack");
                ChannelResult::ok(CHANNEL_NAME)
            }
            Ok(response) => ChannelResult::failed(
                CHANNEL_NAME,
                format!("Slack webhook returned {}", response.status()),
            ),
            Err(e) => ChannelResult::failed(CHANNEL_NAME, format!("request failed: {e}")),
        }
    }
}

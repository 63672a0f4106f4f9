//! Telegram bot alert channel.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use fleetwatch_core::config::alerts::TelegramConfig;

use crate::channel::{AlertChannel, AlertMessage, ChannelResult};
use crate::channels::render_text;

const CHANNEL_NAME: &str = "telegram";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends alerts to a chat via the Telegram bot API.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    /// Build the channel against the public bot API.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }

    /// Point the channel at a local API stand-in.
    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    fn enabled(&self) -> bool {
        self.config.enabled && !self.config.bot_token.is_empty() && !self.config.chat_id.is_empty()
    }

    async fn send_alert(&self, alert: &AlertMessage) -> ChannelResult {
        if !self.enabled() {
            return ChannelResult::failed(CHANNEL_NAME, "channel is not configured");
        }

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": render_text(alert),
        });

        match self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(chat_id = %self.config.chat_id, "alert sent to Telegram");
                ChannelResult::ok(CHANNEL_NAME)
            }
            Ok(response) => ChannelResult::failed(
                CHANNEL_NAME,
                format!("Telegram API returned {}", response.status()),
            ),
            Err(e) => ChannelResult::failed(CHANNEL_NAME, format!("request failed: {e}")),
        }
    }
}
